// ABOUTME: `docker ps` with label filters, and a parser for every listing shape it may print.
// ABOUTME: Handles JSON lines, a JSON array, column tables sliced at header offsets, and bare IDs.

use serde_json::Value;
use std::collections::HashMap;

use super::classify::unexpected_output;
use super::{DockerCommand, ExitPolicy};
use crate::error::Result;
use crate::process::ExecResult;
use crate::types::ContainerId;

/// Summary information about a listed container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    pub fn container_id(&self) -> ContainerId {
        ContainerId::new(self.id.clone())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Output shape requested from `docker ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsFormat {
    /// One JSON object per line (`--format {{json .}}`).
    #[default]
    Json,
    /// The CLI's default column table.
    Table,
    /// Only IDs (`--quiet`).
    Quiet,
}

/// `docker ps`: list containers.
///
/// Fails on non-zero exit.
#[derive(Debug, Clone, Default)]
pub struct PsCommand {
    all: bool,
    filters: Vec<String>,
    format: PsFormat,
    raw: Vec<String>,
}

impl PsCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include stopped containers.
    pub fn all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Add a `--filter label=key=value` clause.
    pub fn label_filter(mut self, key: &str, value: &str) -> Self {
        self.filters.push(format!("label={key}={value}"));
        self
    }

    /// Add an arbitrary `--filter` clause.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn format(mut self, format: PsFormat) -> Self {
        self.format = format;
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }
}

impl DockerCommand for PsCommand {
    type Output = Vec<ContainerSummary>;

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["ps".to_string()];
        if self.all {
            args.push("--all".to_string());
        }
        args.push("--no-trunc".to_string());
        for filter in &self.filters {
            args.push("--filter".to_string());
            args.push(filter.clone());
        }
        match self.format {
            PsFormat::Json => {
                args.push("--format".to_string());
                args.push("{{json .}}".to_string());
            }
            PsFormat::Table => {}
            PsFormat::Quiet => args.push("--quiet".to_string()),
        }
        args
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn parse(&self, result: ExecResult) -> Result<Vec<ContainerSummary>> {
        parse_listing(&result.stdout)
            .ok_or_else(|| unexpected_output(self.build_args().join(" "), result))
    }
}

/// Parse any listing `docker ps` (or `podman ps`) may print.
pub fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerSummary>> {
    parse_listing(stdout).ok_or_else(|| {
        unexpected_output(
            "ps",
            ExecResult {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
            },
        )
    })
}

/// `None` when the output looks like JSON but does not parse.
fn parse_listing(stdout: &str) -> Option<Vec<ContainerSummary>> {
    let text = stdout.trim();
    if text.is_empty() {
        return Some(Vec::new());
    }

    if text.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(text).ok()?;
        return Some(values.iter().map(summary_from_json).collect());
    }

    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    let Some(first) = lines.peek().copied() else {
        return Some(Vec::new());
    };

    if first.trim_start().starts_with('{') {
        return lines
            .map(|line| {
                serde_json::from_str::<Value>(line)
                    .ok()
                    .map(|v| summary_from_json(&v))
            })
            .collect();
    }

    if first.starts_with("CONTAINER ID") {
        let columns = header_columns(first);
        return Some(
            lines
                .skip(1)
                .map(|row| summary_from_row(&columns, row))
                .collect(),
        );
    }

    Some(
        lines
            .map(|id| ContainerSummary {
                id: id.trim().to_string(),
                ..Default::default()
            })
            .collect(),
    )
}

/// Column names with the character position each one starts at.
///
/// Names are separated by two or more spaces; a single space belongs to
/// the name, as in `CONTAINER ID`.
fn header_columns(header: &str) -> Vec<(String, usize)> {
    let mut starts = Vec::new();
    let mut spaces = 0;
    for (pos, c) in header.chars().enumerate() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        if starts.is_empty() || spaces >= 2 {
            starts.push(pos);
        }
        spaces = 0;
    }

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied();
            (slice_chars(header, start, end).to_string(), start)
        })
        .collect()
}

/// Characters `start..end` of `line`, trimmed; `end` of `None` runs to the end.
fn slice_chars(line: &str, start: usize, end: Option<usize>) -> &str {
    let byte_at = |n: usize| {
        line.char_indices()
            .nth(n)
            .map_or(line.len(), |(i, _)| i)
    };
    let from = byte_at(start);
    let to = end.map_or(line.len(), byte_at);
    line.get(from..to).unwrap_or_default().trim()
}

/// Rows are aligned under the header, so empty cells (PORTS on a
/// stopped container) leave blanks instead of shifting later columns.
fn summary_from_row(columns: &[(String, usize)], row: &str) -> ContainerSummary {
    let mut summary = ContainerSummary::default();
    for (n, (name, start)) in columns.iter().enumerate() {
        let end = columns.get(n + 1).map(|(_, next)| *next);
        let value = slice_chars(row, *start, end);
        match name.as_str() {
            "CONTAINER ID" => summary.id = value.to_string(),
            "IMAGE" => summary.image = value.to_string(),
            "STATUS" => summary.status = value.to_string(),
            "STATE" => summary.state = value.to_string(),
            "NAMES" => summary.names = value.to_string(),
            "LABELS" => summary.labels = parse_label_list(value),
            _ => {}
        }
    }
    summary
}

fn summary_from_json(value: &Value) -> ContainerSummary {
    let text = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| value.get(*k))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };

    let labels = match value.get("Labels") {
        Some(Value::String(s)) => parse_label_list(s),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect(),
        _ => HashMap::new(),
    };

    ContainerSummary {
        id: text(&["ID", "Id"]),
        names: text(&["Names", "Name"]),
        image: text(&["Image"]),
        state: text(&["State"]),
        status: text(&["Status"]),
        labels,
    }
}

/// Parse docker's `k=v,k=v` label rendering.
fn parse_label_list(s: &str) -> HashMap<String, String> {
    s.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.to_string()))
        })
        .collect()
}
