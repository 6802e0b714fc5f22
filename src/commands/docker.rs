use super::{string_arg, subcommand};
use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::utils::process::run_captured;
use crate::Result;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use serde_json::json;
use std::path::PathBuf;

const DEFAULT_IDENTIFIER: &str = "myapp";
const DEFAULT_PORT: &str = "3000";

const NODE_DOCKERFILE: &str = "# syntax=docker/dockerfile:1
FROM node:18-alpine
WORKDIR /app
COPY package*.json ./
RUN npm ci --only=production
COPY . .
CMD [\"node\", \"index.js\"]
";

const PYTHON_DOCKERFILE: &str = "# syntax=docker/dockerfile:1
FROM python:3.9-slim
WORKDIR /app
COPY requirements.txt ./
RUN pip install --no-cache-dir -r requirements.txt
COPY . .
CMD [\"python\", \"main.py\"]
";

const STATIC_DOCKERFILE: &str = "# syntax=docker/dockerfile:1
FROM nginx:alpine
COPY . /usr/share/nginx/html
";

/// Project types `createfile` knows, as (flag value, prompt label, template)
const KINDS: [(&str, &str, &str); 3] = [
    ("node", "Node.js", NODE_DOCKERFILE),
    ("python", "Python", PYTHON_DOCKERFILE),
    ("static", "Static HTML", STATIC_DOCKERFILE),
];

/// `docker createfile | build | run`
pub struct DockerCommand;

#[async_trait]
impl CliCommand for DockerCommand {
    fn name(&self) -> &str {
        "docker"
    }

    fn definition(&self) -> clap::Command {
        let identifier = Arg::new("identifier")
            .default_value(DEFAULT_IDENTIFIER)
            .help("Image and container name");

        clap::Command::new("docker")
            .about("Docker helpers: createfile | build | run")
            .subcommand_required(true)
            .subcommand(
                clap::Command::new("createfile")
                    .about("Write a Dockerfile for a project type")
                    .arg(
                        Arg::new("kind")
                            .long("kind")
                            .value_parser(KINDS.map(|(kind, _, _)| kind))
                            .help("Project type; prompts when omitted"),
                    )
                    .arg(
                        Arg::new("dir")
                            .long("dir")
                            .value_name("DIR")
                            .value_parser(value_parser!(PathBuf))
                            .default_value(".")
                            .help("Directory to write the Dockerfile into"),
                    )
                    .arg(
                        Arg::new("force")
                            .long("force")
                            .action(ArgAction::SetTrue)
                            .help("Overwrite an existing Dockerfile"),
                    ),
            )
            .subcommand(
                clap::Command::new("build")
                    .about("Build <identifier>:latest from the current directory")
                    .arg(identifier.clone()),
            )
            .subcommand(
                clap::Command::new("run")
                    .about("Start <identifier>:latest detached with a port mapping")
                    .arg(identifier)
                    .arg(port_arg("host-port", "Host port; prompts when omitted"))
                    .arg(port_arg("container-port", "Container port; prompts when omitted")),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let (action, sub) = subcommand(self, args)?;
        match action {
            "createfile" => create_file(ctx, sub).await,
            "build" => build(ctx, string_arg(sub, "identifier").unwrap_or(DEFAULT_IDENTIFIER)).await,
            "run" => run_container(ctx, sub).await,
            other => Err(CliError::usage(format!("unknown docker action '{}'", other))),
        }
    }
}

fn port_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_name("PORT")
        .value_parser(value_parser!(u16).range(1..))
        .help(help)
}

/// Image names are passed straight to docker, so they must not look like flags
fn validate_identifier(identifier: &str) -> Result<()> {
    let valid = !identifier.is_empty()
        && !identifier.starts_with('-')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'));
    if valid {
        Ok(())
    } else {
        Err(CliError::validation(
            "identifier",
            format!("'{}' is not a valid image name", identifier),
        ))
    }
}

/// Container name for an image identifier: its last path segment
fn container_name(identifier: &str) -> Result<&str> {
    let name = identifier.rsplit('/').next().unwrap_or(identifier);
    if name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        Ok(name)
    } else {
        Err(CliError::validation(
            "identifier",
            format!("'{}' does not end in a usable container name", identifier),
        ))
    }
}

async fn create_file(ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
    let kind = match string_arg(args, "kind") {
        Some(kind) => kind.to_string(),
        None => {
            let labels: Vec<&str> = KINDS.iter().map(|(_, label, _)| *label).collect();
            let label = ctx
                .interaction()
                .select("Select project type for Dockerfile:", &labels)
                .await?;
            KINDS
                .iter()
                .find(|(_, l, _)| *l == label)
                .map(|(kind, _, _)| kind.to_string())
                .ok_or_else(|| CliError::validation("kind", format!("unknown project type '{}'", label)))?
        }
    };

    let template = KINDS
        .iter()
        .find(|(k, _, _)| *k == kind)
        .map(|(_, _, template)| *template)
        .ok_or_else(|| CliError::validation("kind", format!("unknown project type '{}'", kind)))?;

    let dir = args
        .get_one::<PathBuf>("dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join("Dockerfile");
    if path.exists() && !args.get_flag("force") {
        return Err(CliError::already_exists(format!(
            "{} (use --force to overwrite)",
            path.display()
        )));
    }

    std::fs::write(&path, template).map_err(|e| CliError::file_system(&path, e))?;
    tracing::info!(kind = %kind, path = %path.display(), "Dockerfile written");

    Ok(CommandOutput::new(json!({
        "status": "success",
        "action": "createfile",
        "kind": kind,
        "file": path.display().to_string(),
    }))
    .success(format!("✔ Dockerfile provisioned at {}", path.display())))
}

async fn build(ctx: &AppContext, identifier: &str) -> Result<CommandOutput> {
    validate_identifier(identifier)?;
    let image = format!("{}:latest", identifier);

    ctx.audit()
        .record_best_effort("docker build", &[identifier, "latest", "."]);
    let output = run_captured("docker", &["build".to_string(), "-t".to_string(), image.clone(), ".".to_string()]).await?;

    Ok(output
        .stdout
        .lines()
        .fold(
            CommandOutput::new(json!({ "status": "success", "action": "build", "image": identifier })),
            |out, line| out.dim(line),
        )
        .success(format!("✔ Image {} built", image)))
}

async fn run_container(ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
    let identifier = string_arg(args, "identifier").unwrap_or(DEFAULT_IDENTIFIER);
    validate_identifier(identifier)?;
    let name = container_name(identifier)?;

    let host_port = port_or_prompt(ctx, args, "host-port", "Host port:").await?;
    let container_port = port_or_prompt(ctx, args, "container-port", "Container port:").await?;
    let mapping = format!("{}:{}", host_port, container_port);

    ctx.audit()
        .record_best_effort("docker run", &["-d", identifier, mapping.as_str()]);
    let output = run_captured(
        "docker",
        &[
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
            "-p".to_string(),
            mapping.clone(),
            format!("{}:latest", identifier),
        ],
    )
    .await?;

    let container_id = output.stdout.trim().to_string();
    Ok(CommandOutput::new(json!({
        "status": "success",
        "action": "run",
        "container": name,
        "image": identifier,
        "containerId": container_id,
        "ports": mapping,
    }))
    .success(format!("✔ Container {} running ({})", name, mapping)))
}

async fn port_or_prompt(ctx: &AppContext, args: &ArgMatches, id: &str, prompt: &str) -> Result<u16> {
    if let Some(port) = args.get_one::<u16>(id) {
        return Ok(*port);
    }

    let answer = ctx.interaction().text(prompt, Some(DEFAULT_PORT)).await?;
    answer
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| CliError::validation(id, format!("'{}' is not a valid port", answer.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_createfile_writes_template() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        let target = dir.path().to_string_lossy().to_string();

        let output = testing::run(&DockerCommand, &ctx, &["createfile", "--kind", "python", "--dir", &target])
            .await
            .unwrap();
        assert_eq!(output.data["kind"], "python");

        let content = std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(content.contains("FROM python:3.9-slim"));
    }

    #[tokio::test]
    async fn test_createfile_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        let target = dir.path().to_string_lossy().to_string();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let err = testing::run(&DockerCommand, &ctx, &["createfile", "--kind", "node", "--dir", &target])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::AlreadyExists { .. }));

        testing::run(&DockerCommand, &ctx, &["createfile", "--kind", "static", "--dir", &target, "--force"])
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(content.contains("nginx:alpine"));
    }

    #[tokio::test]
    async fn test_createfile_prompts_for_kind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().to_string_lossy().to_string();
        let err = testing::run(&DockerCommand, &testing::context(&dir), &["createfile", "--dir", &target])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InteractiveDisabled { .. }));
    }

    #[tokio::test]
    async fn test_run_without_ports_in_ci_does_not_spawn() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir);

        let err = testing::run(&DockerCommand, &ctx, &["run", "web"]).await.unwrap_err();
        assert!(matches!(err, CliError::InteractiveDisabled { .. }));
        assert!(ctx.audit().entries().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_and_bad_port_are_usage_errors() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        let err = testing::run(&DockerCommand, &ctx, &["deploy"]).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = testing::run(&DockerCommand, &ctx, &["run", "--host-port", "0"]).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("myapp").is_ok());
        assert!(validate_identifier("registry.local/team/app_1").is_ok());
        assert!(validate_identifier("--privileged").is_err());
        assert!(validate_identifier("my app").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_container_name_is_last_path_segment() {
        assert_eq!(container_name("myapp").unwrap(), "myapp");
        assert_eq!(container_name("registry.local/team/app_1").unwrap(), "app_1");
        assert!(container_name("team/").is_err());
        assert!(container_name("team/_hidden").is_err());
    }
}
