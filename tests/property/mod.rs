mod report_roundtrip;
mod uptodate_props;
