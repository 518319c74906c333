//! Query node descriptions via `scontrol show node`.

use crate::source::{SlurmSource, SourceError, SourceKind};
use crate::types::{NodeRecord, ParsedLines};
use jobinfo_parsers::{non_empty_string, parse_memory_kb, parse_optional, parse_optional_number};
use std::collections::HashMap;

pub(crate) fn command_args(identifier: &str) -> Vec<String> {
    vec![
        "show".to_string(),
        "node".to_string(),
        identifier.to_string(),
        "--oneliner".to_string(),
    ]
}

/// Split a oneliner into `Key=Value` pairs.
///
/// Some values contain spaces (`OS=Linux 5.14.0 #1 SMP`); tokens without
/// `=` are appended to the previous value.
fn key_values(line: &str) -> HashMap<&str, String> {
    let mut pairs: HashMap<&str, String> = HashMap::new();
    let mut last_key = None;

    for token in line.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => {
                pairs.insert(key, value.to_string());
                last_key = Some(key);
            }
            None => {
                if let Some(value) = last_key.and_then(|k| pairs.get_mut(k)) {
                    value.push(' ');
                    value.push_str(token);
                }
            }
        }
    }
    pairs
}

/// Parse a Gres string such as `gpu:a100:4(S:0-1)` or `gpu:2,gpu:v100:1`.
fn parse_gres(gres: &str) -> (u32, Option<String>) {
    let mut count = 0;
    let mut types: Vec<&str> = Vec::new();

    for item in gres.split(',') {
        // Drop socket binding "(S:0-1)"
        let item = item.split('(').next().unwrap_or(item);
        let parts: Vec<&str> = item.split(':').collect();
        if parts.first() != Some(&"gpu") {
            continue;
        }
        match parts.as_slice() {
            [_, n] => count += n.parse::<u32>().unwrap_or(0),
            [_, kind, n] => {
                count += n.parse::<u32>().unwrap_or(0);
                if !types.contains(kind) {
                    types.push(*kind);
                }
            }
            _ => {}
        }
    }

    let gpu_type = if types.is_empty() {
        None
    } else {
        Some(types.join(","))
    };
    (count, gpu_type)
}

fn list_field(value: Option<&String>) -> Vec<String> {
    value
        .and_then(|v| non_empty_string(v))
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Parse a single `scontrol show node --oneliner` line.
pub fn parse_node_line(line: &str) -> Result<NodeRecord, String> {
    let pairs = key_values(line);
    let name = pairs
        .get("NodeName")
        .and_then(|n| non_empty_string(n))
        .ok_or("missing NodeName")?;

    let field = |key: &str| pairs.get(key).map(String::as_str).unwrap_or("");
    let (gpus, gpu_type) = match pairs.get("Gres") {
        Some(gres) => {
            let (count, kind) = parse_gres(gres);
            (Some(count), kind)
        }
        None => (None, None),
    };

    Ok(NodeRecord {
        name,
        cpus: parse_optional_number(field("CPUTot"), "CPUTot")?,
        cpus_allocated: parse_optional_number(field("CPUAlloc"), "CPUAlloc")?,
        // scontrol prints node memory in MB
        real_memory_kb: parse_optional(field("RealMemory"), "RealMemory", parse_memory_kb)?,
        allocated_memory_kb: parse_optional(field("AllocMem"), "AllocMem", parse_memory_kb)?,
        gpus,
        gpu_type,
        state: pairs.get("State").and_then(|s| non_empty_string(s)),
        features: list_field(pairs.get("AvailableFeatures")),
        partitions: list_field(pairs.get("Partitions")),
    })
}

pub fn parse_scontrol_output(output: &str) -> ParsedLines<NodeRecord> {
    ParsedLines::parse(output, "scontrol", parse_node_line)
}

/// Describe one node (or a comma-joined node list fragment).
///
/// Unknown node names give no records.
pub async fn query_node<S: SlurmSource>(
    source: &S,
    name: &str,
) -> Result<Vec<NodeRecord>, SourceError> {
    let Some(stdout) = source.fetch(SourceKind::Node, name).await? else {
        tracing::debug!("scontrol does not know node {}", name);
        return Ok(Vec::new());
    };

    Ok(parse_scontrol_output(&stdout).into_records())
}
