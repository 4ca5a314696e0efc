use anyhow::{Context, Result, bail};
use console::style;
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::core::activity::{empty_object, timestamp_now};
use crate::core::client::TrackerClient;
use crate::core::terminal::{GuideSection, print_step, print_success};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClientCommand {
    Health,
    Status,
    List {
        limit: Option<usize>,
        status: Option<String>,
    },
    Get {
        id: String,
    },
    Create {
        kind: String,
        description: String,
        metadata: Value,
    },
    Update {
        id: String,
        status: String,
        result: Value,
    },
    Clear,
    Process {
        task: String,
        data: Value,
    },
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClientArgs {
    pub server: String,
    pub command: ClientCommand,
    pub auth: Option<(String, String)>,
    pub timeout: Duration,
}

fn parse_json_flag(name: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} must be valid JSON", name))
}

/// Parse everything after `taskboard client`.
pub(crate) fn parse_client_args(args: &[String]) -> Result<ClientArgs> {
    let mut positional: Vec<&str> = Vec::new();
    let mut limit = None;
    let mut status_filter = None;
    let mut json_body: Option<Value> = None;
    let mut user = None;
    let mut password = None;
    let mut timeout = DEFAULT_TIMEOUT;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if !flag.starts_with("--") {
            positional.push(flag);
            i += 1;
            continue;
        }
        let Some(value) = args.get(i + 1) else {
            bail!("{} needs a value", flag);
        };
        match flag {
            "--limit" => {
                limit = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid --limit {:?}", value))?,
                )
            }
            "--status" => status_filter = Some(value.clone()),
            "--metadata" | "--result" | "--data" => json_body = Some(parse_json_flag(flag, value)?),
            "--user" => user = Some(value.clone()),
            "--password" => password = Some(value.clone()),
            "--timeout" => {
                let ms: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --timeout {:?}", value))?;
                timeout = Duration::from_millis(ms.max(1));
            }
            other => bail!("unknown flag {}", other),
        }
        i += 2;
    }

    let (server, rest) = match positional.split_first() {
        Some((server, rest)) => (server.to_string(), rest),
        None => bail!("missing server address"),
    };
    let Some((&name, operands)) = rest.split_first() else {
        bail!("missing client command");
    };

    let operand = |idx: usize, what: &str| -> Result<String> {
        operands
            .get(idx)
            .map(|s| s.to_string())
            .with_context(|| format!("{} requires <{}>", name, what))
    };

    let command = match name {
        "health" => ClientCommand::Health,
        "status" => ClientCommand::Status,
        "list" => ClientCommand::List {
            limit,
            status: status_filter,
        },
        "get" => ClientCommand::Get {
            id: operand(0, "id")?,
        },
        "create" => ClientCommand::Create {
            kind: operand(0, "type")?,
            description: operand(1, "description")?,
            metadata: json_body.unwrap_or_else(empty_object),
        },
        "update" => ClientCommand::Update {
            id: operand(0, "id")?,
            status: operand(1, "status")?,
            result: json_body.unwrap_or_else(empty_object),
        },
        "clear" => ClientCommand::Clear,
        "process" => ClientCommand::Process {
            task: operand(0, "task")?,
            data: json_body.unwrap_or(Value::Null),
        },
        "demo" => ClientCommand::Demo,
        other => bail!("unknown client command {:?}", other),
    };

    let auth = match (user, password) {
        (Some(user), Some(password)) => Some((user, password)),
        (None, None) => None,
        _ => bail!("--user and --password must be given together"),
    };

    Ok(ClientArgs {
        server,
        command,
        auth,
        timeout,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn run_client_command(args: &[String]) -> Result<()> {
    let parsed = parse_client_args(args)?;
    let mut client = TrackerClient::new(&parsed.server, parsed.timeout)?;
    if let Some((user, password)) = &parsed.auth {
        client = client.with_basic_auth(user, password);
    }

    match parsed.command {
        ClientCommand::Health => print_json(&client.health().await?)?,
        ClientCommand::Status => print_json(&client.status().await?)?,
        ClientCommand::List { limit, status } => {
            let list = client.list_activities(limit, status.as_deref()).await?;
            print_success(&format!("{} activities", list.count));
            print_json(&list.activities)?;
        }
        ClientCommand::Get { id } => match client.get_activity(&id).await {
            Ok(activity) => print_json(&activity)?,
            Err(e) if e.is_not_found() => bail!("no activity with id {}", id),
            Err(e) => return Err(e.into()),
        },
        ClientCommand::Create {
            kind,
            description,
            metadata,
        } => {
            let activity = client.create_activity(&kind, &description, metadata).await?;
            print_success(&format!("Created activity {}", activity.id));
            print_json(&activity)?;
        }
        ClientCommand::Update { id, status, result } => {
            let activity = match client.update_activity(&id, &status, result).await {
                Ok(activity) => activity,
                Err(e) if e.is_not_found() => bail!("no activity with id {}", id),
                Err(e) => return Err(e.into()),
            };
            print_success(&format!("Activity {} is now {}", activity.id, activity.status));
            print_json(&activity)?;
        }
        ClientCommand::Clear => {
            client.clear_activities().await?;
            print_success("Activities cleared");
        }
        ClientCommand::Process { task, data } => {
            let result = client.process_task(&task, data).await?;
            print_success(&format!("Task processed as {}", result.task_id));
            print_json(&result)?;
        }
        ClientCommand::Demo => run_demo(&client).await?,
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Walk through the main endpoints once, printing a short summary of each.
async fn run_demo(client: &TrackerClient) -> Result<()> {
    GuideSection::new("Tracker demo")
        .status("Server", client.base_url())
        .print();
    println!();

    print_step("1. Health check");
    let health = client.health().await?;
    println!("   Status: {}", style(&health.status).green());

    print_step("2. System status");
    let status = client.status().await?;
    println!("   Status: {}", status.status);
    println!("   Version: {}", status.version.as_deref().unwrap_or("unknown"));
    if let Some(counts) = &status.activities {
        println!("   Total: {}", counts.total.unwrap_or(0.0));
        println!("   Running: {}", counts.running.unwrap_or(0.0));
        println!("   Completed: {}", counts.completed.unwrap_or(0.0));
    }

    print_step("3. Recent activities");
    let list = client.list_activities(Some(5), None).await?;
    println!("   Count: {}", list.count);
    for activity in list.activities.iter().take(3) {
        println!("   - [{}] {}", activity.kind, activity.description);
        println!(
            "     Status: {} | ID: {}",
            activity.status,
            short_id(&activity.id)
        );
    }

    print_step("4. Create activity");
    let now = timestamp_now();
    let created = client
        .create_activity(
            "cli_demo",
            &format!("Demo run at {}", now),
            json!({ "client": "taskboard", "timestamp": now }),
        )
        .await?;
    println!("   ID: {}", created.id);
    println!("   Type: {}", created.kind);
    println!("   Status: {}", created.status);

    print_step("5. Process task");
    let processed = client
        .process_task(
            "demo_processing",
            json!({ "operation": "test", "values": [1, 2, 3, 4, 5] }),
        )
        .await?;
    println!("   Task ID: {}...", short_id(&processed.task_id));

    println!();
    print_success("Demo finished");
    Ok(())
}
