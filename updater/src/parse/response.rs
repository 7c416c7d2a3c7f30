//! Extraction of job and version facts from device XML responses
//!
//! Every function takes the raw response body. A required element that is
//! missing is a [`ParseError`]; an optional element that is missing (the next
//! job of a job chain) is `Ok(None)`.

use roxmltree::{Document, Node};

use crate::errors::ParseError;
use crate::models::device::InstalledVersions;
use crate::models::job::{JobState, JobStatus};
use crate::models::version::Version;

/// Parse a response body and reject `<response status="error">` envelopes
fn parse_document(xml: &str) -> Result<Document<'_>, ParseError> {
    let doc = Document::parse(xml).map_err(|e| ParseError::MalformedXml(e.to_string()))?;

    let root = doc.root_element();
    if root.has_tag_name("response") && root.attribute("status") == Some("error") {
        return Err(ParseError::DeviceError(error_message(root)));
    }

    Ok(doc)
}

/// Collect the `<msg>`/`<line>` text of an error envelope
fn error_message(root: Node<'_, '_>) -> String {
    let lines: Vec<&str> = root
        .descendants()
        .filter(|n| n.is_element() && (n.has_tag_name("line") || n.has_tag_name("msg")))
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if lines.is_empty() {
        "no message".to_string()
    } else {
        lines.join("; ")
    }
}

fn first_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.has_tag_name(name))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(name))
}

fn trimmed_text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Job id from an install-initiation response (`<result><job>42</job></result>`)
pub fn find_job_id(xml: &str) -> Result<String, ParseError> {
    let doc = parse_document(xml)?;
    doc.root_element()
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name("job"))
        .find_map(trimmed_text)
        .ok_or(ParseError::MissingElement("job"))
}

/// Next job id from a job-status response
///
/// Returns `Ok(None)` when the job did not enqueue a successor.
pub fn find_next_job_id(xml: &str) -> Result<Option<String>, ParseError> {
    let doc = parse_document(xml)?;
    Ok(first_element(doc.root_element(), "nextjob").and_then(trimmed_text))
}

/// Status, progress and result of the job in a `show jobs id` response
pub fn find_job_status(xml: &str) -> Result<JobStatus, ParseError> {
    let doc = parse_document(xml)?;

    // Some firmware nests several <job> entries; the last one carrying a status wins.
    let job = doc
        .root_element()
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name("job"))
        .filter(|n| child_element(*n, "status").is_some())
        .last()
        .ok_or(ParseError::MissingElement("job"))?;

    let state = child_element(job, "status")
        .and_then(trimmed_text)
        .map(|s| JobState::parse(&s))
        .ok_or(ParseError::MissingElement("status"))?;

    let raw_progress = child_element(job, "progress")
        .and_then(trimmed_text)
        .ok_or(ParseError::MissingElement("progress"))?;
    let progress = parse_progress(&raw_progress, &state)?;

    let result = child_element(job, "result").and_then(trimmed_text);
    let details = child_element(job, "details").and_then(|d| {
        let lines: Vec<String> = d
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("line"))
            .filter_map(trimmed_text)
            .collect();
        if lines.is_empty() {
            trimmed_text(d)
        } else {
            Some(lines.join("; "))
        }
    });

    Ok(JobStatus {
        state,
        progress,
        result,
        details,
    })
}

fn parse_progress(raw: &str, state: &JobState) -> Result<u8, ParseError> {
    match raw.parse::<u32>() {
        Ok(value) => Ok(value.min(100) as u8),
        // Finished jobs may report their completion time here
        Err(_) if state.is_finished() => Ok(100),
        Err(_) => Err(ParseError::InvalidValue {
            element: "progress",
            value: raw.to_string(),
        }),
    }
}

/// Installed content versions from a `show system info` response
pub fn find_content_versions(xml: &str) -> Result<InstalledVersions, ParseError> {
    let doc = parse_document(xml)?;
    let system = first_element(doc.root_element(), "system")
        .ok_or(ParseError::MissingElement("system"))?;

    let version = |name: &str| {
        child_element(system, name)
            .and_then(trimmed_text)
            .map(|v| Version::parse(&v))
            .unwrap_or_default()
    };

    Ok(InstalledVersions {
        app: version("app-version"),
        threat: version("threat-version"),
        antivirus: version("av-version"),
        wildfire: version("wildfire-version"),
    })
}

/// Check a response for an error envelope without extracting anything
pub fn ensure_success(xml: &str) -> Result<(), ParseError> {
    parse_document(xml).map(|_| ())
}
