//! Generators that are external commands.

use crate::execution::console::{self, ConsoleWriter, InheritedConsole};
use crate::execution::loader::{EntryPoint, ModuleCatalog, ModuleEnv};
use anyhow::Context;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

/// Environment variable carrying the context's search path to the command
pub const RESOURCE_PATH_ENV: &str = "PROVGEN_RESOURCE_PATH";

/// Entry point that runs a program with the unit arguments appended
///
/// The program's output is forwarded line by line through the console, so it
/// picks up the worker's prefix.
#[derive(Debug, Clone)]
pub struct CommandEntryPoint {
    program: String,
    args: Vec<String>,
    method: String,
    search_path: Vec<PathBuf>,
}

impl CommandEntryPoint {
    pub fn new(program: &str, args: Vec<String>, method: &str, env: &ModuleEnv) -> Self {
        Self {
            program: program.to_string(),
            args,
            method: method.to_string(),
            search_path: env.search_path.clone(),
        }
    }

    /// Register `name` in `catalog` as this command
    pub fn register(
        catalog: ModuleCatalog,
        name: &str,
        program: &str,
        args: Vec<String>,
        method: &str,
    ) -> ModuleCatalog {
        let program = program.to_string();
        let method = method.to_string();
        catalog.register(name, move |env| {
            Ok(Arc::new(CommandEntryPoint::new(&program, args.clone(), &method, env))
                as Arc<dyn EntryPoint>)
        })
    }
}

impl EntryPoint for CommandEntryPoint {
    fn has_method(&self, method: &str) -> bool {
        method == self.method
    }

    fn invoke(&self, _method: &str, args: &[String]) -> anyhow::Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !self.search_path.is_empty() {
            let joined = std::env::join_paths(&self.search_path)
                .context("search path contains a separator character")?;
            command.env(RESOURCE_PATH_ENV, joined);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;
        let stdout = child.stdout.take().context("child stdout was not piped")?;
        let stderr = child.stderr.take().context("child stderr was not piped")?;

        let inherited = console::inherit();
        let forwarded = thread::scope(|scope| {
            let out = {
                let inherited = inherited.clone();
                scope.spawn(move || forward_lines(stdout, inherited, console::stdout))
            };
            let err = scope.spawn(move || forward_lines(stderr, inherited, console::stderr));
            [out.join(), err.join()]
        });

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for {}", self.program))?;
        for result in forwarded {
            result
                .map_err(|_| anyhow::anyhow!("output forwarding for {} panicked", self.program))?
                .with_context(|| format!("failed to forward output of {}", self.program))?;
        }

        if !status.success() {
            anyhow::bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Copy `reader` to a console stream one line at a time, as lines arrive
fn forward_lines(
    reader: impl Read,
    inherited: InheritedConsole,
    writer: fn() -> ConsoleWriter,
) -> io::Result<()> {
    let _redirect = inherited.install();
    let mut sink = writer();
    for line in BufReader::new(reader).split(b'\n') {
        sink.write_all(&line?)?;
        sink.write_all(b"\n")?;
    }
    sink.flush()
}
