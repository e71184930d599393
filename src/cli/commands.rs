//! Command dispatch

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings, ENV_PREFIX};
use crate::domain::Diagnostic;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, InfraResult};
use crate::tree_traits::TreeNodeConvert;

/// Local config file created by `config init`.
const LOCAL_CONFIG_FILE: &str = "treeview.toml";

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run with --help".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        return cmd_completion(*shell);
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Commands::Render { embed: true, .. } = command {
        settings.render.embed_payload = true;
    }
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Render { nodes, output, .. } => cmd_render(&container, nodes, output.as_deref()),
        Commands::Build { nodes, strict } => cmd_build(&container, nodes, *strict),
        Commands::Bind { nodes, selected } => cmd_bind(&container, nodes, selected),
        Commands::Flatten { forest } => cmd_flatten(&container, forest),
        Commands::Tree { nodes } => cmd_tree(&container, nodes),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cmd_config_show(&container),
            ConfigCommands::Init { global, force } => cmd_config_init(&container, *global, *force),
            ConfigCommands::Path => cmd_config_path(cli.config.as_deref()),
        },
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_render(container: &ServiceContainer, nodes: &Path, target: Option<&Path>) -> CliResult<()> {
    let rendered = container.tree_view.render(nodes)?;
    report_diagnostics(&rendered.diagnostics);
    match target {
        Some(path) => {
            container.tree_view.write_output(path, &rendered.html)?;
            output::action("Wrote", &path.display());
        }
        None => output::info(&rendered.html),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_build(container: &ServiceContainer, nodes: &Path, strict: bool) -> CliResult<()> {
    let forest = container.tree_view.build(nodes)?;
    if strict {
        let roots = forest.into_strict().map_err(ApplicationError::from)?;
        return print_json(&roots);
    }
    report_diagnostics(&forest.diagnostics);
    print_json(&forest.roots)
}

fn cmd_bind(container: &ServiceContainer, nodes: &Path, selected: &Path) -> CliResult<()> {
    let forest = container.tree_view.bind(nodes, selected)?;
    report_diagnostics(&forest.diagnostics);
    print_json(&forest.roots)
}

fn cmd_flatten(container: &ServiceContainer, forest: &Path) -> CliResult<()> {
    let flat = container.tree_view.flatten(forest)?;
    debug!("flatten: {} nodes", flat.len());
    print_json(&flat)
}

fn cmd_tree(container: &ServiceContainer, nodes: &Path) -> CliResult<()> {
    let forest = container.tree_view.build(nodes)?;
    report_diagnostics(&forest.diagnostics);
    output::info(&forest.to_tree_string());
    Ok(())
}

fn cmd_config_show(container: &ServiceContainer) -> CliResult<()> {
    output::info(&container.settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(container: &ServiceContainer, global: bool, force: bool) -> CliResult<()> {
    let path = if global {
        global_config_path().ok_or_else(|| ApplicationError::Config {
            message: "cannot determine config directory".to_string(),
        })?
    } else {
        PathBuf::from(LOCAL_CONFIG_FILE)
    };

    if container.fs.exists(&path) && !force {
        return Err(CliError::Usage(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }
    container.tree_view.write_output(&path, &Settings::template())?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(local: Option<&Path>) -> CliResult<()> {
    output::header("Config files (lowest to highest precedence)");
    match global_config_path() {
        Some(path) => output::detail(&format!("global: {}{}", path.display(), presence(&path))),
        None => output::detail(&"global: <no config directory>"),
    }
    match local {
        Some(path) => output::detail(&format!("local:  {}{}", path.display(), presence(path))),
        None => output::detail(&"local:  <none, pass --config>"),
    }
    output::detail(&format!("env:    {}_<SECTION>__<KEY>", ENV_PREFIX));
    Ok(())
}

fn cmd_completion(shell: Shell) -> CliResult<()> {
    write_completions(shell, &mut io::stdout().lock())?;
    Ok(())
}

/// Generate the completion script for `shell` and write it to `out`.
///
/// The script is rendered into a buffer first: `generate` cannot report a
/// failed write, `write_all` can.
fn write_completions(shell: Shell, out: &mut dyn Write) -> InfraResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    debug!("completion script: {} bytes for {}", script.len(), shell);
    out.write_all(&script)
        .and_then(|()| out.flush())
        .map_err(|e| InfraError::io("write completions", e))
}

fn presence(path: &Path) -> &'static str {
    if path.exists() {
        ""
    } else {
        " (missing)"
    }
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::Orphan { .. } => output::note(diagnostic),
            _ => output::warning(diagnostic),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "serialize output".to_string(),
            source: Box::new(e),
        }
    })?;
    output::info(&json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::exitcode;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case::bash(Shell::Bash)]
    #[case::zsh(Shell::Zsh)]
    fn given_writable_output_when_writing_completions_then_script_names_binary(
        #[case] shell: Shell,
    ) {
        // Arrange
        let mut out = Vec::new();

        // Act
        write_completions(shell, &mut out).unwrap();

        // Assert
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("treeview"));
    }

    #[test]
    fn given_closed_output_when_writing_completions_then_io_error_maps_to_ioerr() {
        // Arrange
        let mut out = ClosedPipe;

        // Act
        let err = write_completions(Shell::Bash, &mut out).unwrap_err();

        // Assert
        assert!(matches!(&err, InfraError::Io { context, .. } if context == "write completions"));
        assert_eq!(CliError::from(err).exit_code(), exitcode::IOERR);
    }
}
