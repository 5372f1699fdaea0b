use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("`{program} {args}` exited with code {code}: {output}")]
    Failed {
        program: String,
        args: String,
        code: i32,
        output: String,
    },
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    /// Merged stdout + stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Boundary for every privileged command the crate issues. All route/DNS
/// mutations and inspections go through this trait, so tests can script the
/// whole network stack.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Run the command and capture merged output plus exit code. Only a
    /// launch failure is an error here; callers decide how to treat a
    /// non-zero exit.
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let output = command
            .output()
            .await
            .map_err(|source| CommandError::Launch {
                program: program.to_string(),
                source,
            })?;

        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            output: merged,
        })
    }
}

/// Run a command and require exit code zero.
pub async fn run_checked<E: CommandExecutor>(
    executor: &E,
    program: &str,
    args: &[&str],
) -> Result<String> {
    let result = executor.output(program, args).await?;
    if !result.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            args: args.join(" "),
            code: result.code,
            output: normalize_output(&result.output),
        });
    }
    Ok(result.output)
}

/// Run a command where a non-zero exit is acceptable (deleting a route that
/// is already absent). Launch failures still propagate.
pub async fn run_tolerant<E: CommandExecutor>(
    executor: &E,
    program: &str,
    args: &[&str],
) -> Result<String> {
    let result = executor.output(program, args).await?;
    if !result.success() {
        log::debug!(
            "`{} {}` exited with code {} (tolerated)",
            program,
            args.join(" "),
            result.code
        );
    }
    Ok(result.output)
}

fn normalize_output(output: &str) -> String {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
