//! Collaborators backed by external programs.
//!
//! Commands are argv lists. `{project}`, `{scenario}` and `{path}` in any
//! argument are replaced before the program runs. The structured import
//! receives the raw OSM bytes on stdin.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::collaborators::{ImportError, StructuredImport, VectorTileBuilder};

/// Lines of stderr kept in [`ImportError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

/// [`StructuredImport`] that shells out to configured commands.
///
/// A missing command disables that half of the collaborator.
#[derive(Debug, Clone, Default)]
pub struct CommandImport {
    import: Option<Vec<String>>,
    remove: Option<Vec<String>>,
}

impl CommandImport {
    #[must_use]
    pub const fn new(import: Option<Vec<String>>, remove: Option<Vec<String>>) -> Self {
        Self { import, remove }
    }
}

#[async_trait::async_trait]
impl StructuredImport for CommandImport {
    async fn import_road_network(
        &self,
        project_id: i64,
        scenario_id: i64,
        bytes: Vec<u8>,
    ) -> Result<(), ImportError> {
        let Some(argv) = &self.import else {
            log::warn!("p{project_id} s{scenario_id}: no import command configured, skipping");
            return Ok(());
        };
        run(argv, &placeholders(project_id, scenario_id, ""), Some(bytes)).await
    }

    async fn remove_database(&self, project_id: i64, scenario_id: i64) -> Result<(), ImportError> {
        let Some(argv) = &self.remove else {
            return Ok(());
        };
        run(argv, &placeholders(project_id, scenario_id, ""), None).await
    }
}

/// [`VectorTileBuilder`] that shells out to a configured command.
#[derive(Debug, Clone)]
pub struct CommandVectorTiles {
    argv: Vec<String>,
}

impl CommandVectorTiles {
    #[must_use]
    pub const fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait::async_trait]
impl VectorTileBuilder for CommandVectorTiles {
    async fn build(
        &self,
        project_id: i64,
        scenario_id: i64,
        source_path: &str,
    ) -> Result<(), ImportError> {
        run(
            &self.argv,
            &placeholders(project_id, scenario_id, source_path),
            None,
        )
        .await
    }
}

fn placeholders(project_id: i64, scenario_id: i64, path: &str) -> [(&'static str, String); 3] {
    [
        ("{project}", project_id.to_string()),
        ("{scenario}", scenario_id.to_string()),
        ("{path}", path.to_string()),
    ]
}

fn substitute(arg: &str, vars: &[(&str, String)]) -> String {
    vars.iter()
        .fold(arg.to_string(), |acc, (key, value)| acc.replace(key, value))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}

/// Runs `argv`, optionally feeding `stdin`, and fails on a non-zero exit.
async fn run(
    argv: &[String],
    vars: &[(&str, String)],
    stdin: Option<Vec<u8>>,
) -> Result<(), ImportError> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(());
    };
    let args: Vec<String> = args.iter().map(|arg| substitute(arg, vars)).collect();

    log::debug!("Running {program} {}", args.join(" "));

    let mut child = Command::new(program)
        .args(&args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ImportError::Spawn {
            program: program.clone(),
            source,
        })?;

    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(mut pipe), Some(bytes)) = (pipe, stdin) {
            pipe.write_all(&bytes).await?;
            pipe.shutdown().await?;
        }
        Ok::<(), std::io::Error>(())
    };

    // Feed stdin while draining stderr so neither pipe can fill up.
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|source| ImportError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(ImportError::Failed {
            program: program.clone(),
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }

    fed.map_err(|source| ImportError::Spawn {
        program: program.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn substitutes_placeholders() {
        let vars = placeholders(3, 7, "scenario-7/road-network_1");
        assert_eq!(
            substitute("--db=p{project}s{scenario} {path}", &vars),
            "--db=p3s7 scenario-7/road-network_1"
        );
    }

    #[test]
    fn keeps_only_the_stderr_tail() {
        let stderr: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn import_pipes_bytes_to_command() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("net-{project}-{scenario}.osm");
        let import = CommandImport::new(
            Some(argv(&["sh", "-c", "cat > \"$0\"", target.to_str().unwrap()])),
            None,
        );

        import
            .import_road_network(1, 10, b"<osm/>".to_vec())
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("net-1-10.osm")).unwrap();
        assert_eq!(written, b"<osm/>");
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let import = CommandImport::new(None, Some(argv(&["sh", "-c", "echo boom >&2; exit 3"])));

        let err = import.remove_database(1, 10).await.unwrap_err();
        match err {
            ImportError::Failed { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let tiles = CommandVectorTiles::new(argv(&["/nonexistent/ram-tiles", "{path}"]));
        let err = tiles.build(1, 10, "scenario-10/x").await.unwrap_err();
        assert!(matches!(err, ImportError::Spawn { .. }));
    }

    #[tokio::test]
    async fn unconfigured_commands_are_skipped() {
        let import = CommandImport::default();
        import.import_road_network(1, 10, vec![1, 2, 3]).await.unwrap();
        import.remove_database(1, 10).await.unwrap();
    }
}
