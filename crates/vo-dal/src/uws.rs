//! Parser for Universal Worker Service job documents.

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use thiserror::Error;

/// Errors raised while interpreting a UWS job document.
#[derive(Error, Debug)]
pub enum UwsError {
    /// The document was not well-formed XML.
    #[error("{0}")]
    Xml(#[from] roxmltree::Error),
}

/// Execution phase of an asynchronous job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum JobPhase {
    /// Accepted but not yet queued.
    Pending,
    /// Waiting for an execution slot.
    Queued,
    /// Currently running.
    Executing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// Stopped at the client's request.
    Aborted,
    /// Held awaiting a client action.
    Held,
    /// Suspended by the service.
    Suspended,
    /// Retained only as a historical record.
    Archived,
    /// Phase not recognized or not reported.
    #[default]
    Unknown,
}

impl JobPhase {
    /// Parses the wire value, mapping unrecognized phases to `Unknown`.
    pub fn from_identifier(s: &str) -> Self {
        match s.trim() {
            "PENDING" => Self::Pending,
            "QUEUED" => Self::Queued,
            "EXECUTING" => Self::Executing,
            "COMPLETED" => Self::Completed,
            "ERROR" => Self::Error,
            "ABORTED" => Self::Aborted,
            "HELD" => Self::Held,
            "SUSPENDED" => Self::Suspended,
            "ARCHIVED" => Self::Archived,
            _ => Self::Unknown,
        }
    }

    /// Returns the wire identifier for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Aborted => "ABORTED",
            Self::Held => "HELD",
            Self::Suspended => "SUSPENDED",
            Self::Archived => "ARCHIVED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the job can still make progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Queued | Self::Executing | Self::Held | Self::Suspended
        )
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One result link advertised by a completed job.
#[derive(Debug, Clone, Default)]
pub struct JobResult {
    pub(crate) id: String,
    pub(crate) href: String,
}

impl JobResult {
    /// Identifier of the result (typically `"result"`).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// URL the result can be fetched from.
    pub fn href(&self) -> &str {
        &self.href
    }
}

/// A parsed UWS job description.
#[derive(Debug, Clone, Default)]
pub struct UwsJob {
    pub(crate) job_id: String,
    pub(crate) owner_id: Option<String>,
    pub(crate) phase: JobPhase,
    pub(crate) quote: Option<String>,
    pub(crate) start_time: Option<DateTime<Utc>>,
    pub(crate) end_time: Option<DateTime<Utc>>,
    pub(crate) execution_duration: Option<u64>,
    pub(crate) destruction: Option<DateTime<Utc>>,
    pub(crate) error_summary: Option<String>,
    pub(crate) results: Vec<JobResult>,
}

impl UwsJob {
    /// Service-assigned job identifier.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Owner identifier, when the service reports one.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Current execution phase.
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Completion estimate, when the service reports one.
    pub fn quote(&self) -> Option<&str> {
        self.quote.as_deref()
    }

    /// Instant execution started, when reported.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Instant execution finished, when reported.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Maximum execution duration in seconds, when reported.
    pub fn execution_duration(&self) -> Option<u64> {
        self.execution_duration
    }

    /// Instant the job record will be destroyed, when reported.
    pub fn destruction(&self) -> Option<DateTime<Utc>> {
        self.destruction
    }

    /// Error message for jobs in the `ERROR` phase.
    pub fn error_summary(&self) -> Option<&str> {
        self.error_summary.as_deref()
    }

    /// Result links advertised by the job.
    pub fn results(&self) -> &[JobResult] {
        &self.results
    }
}

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

fn text_of(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|child| is_named(*child, name))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

fn attr_any<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|attr| attr.name() == name)
        .map(|attr| attr.value())
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        })
}

/// Parses a UWS job document.
pub fn parse_job(text: &str) -> Result<UwsJob, UwsError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    let error_summary = root
        .children()
        .find(|child| is_named(*child, "errorSummary"))
        .and_then(|summary| text_of(summary, "message"));
    let results = root
        .children()
        .find(|child| is_named(*child, "results"))
        .map(|results| {
            results
                .children()
                .filter(|child| is_named(*child, "result"))
                .map(|result| JobResult {
                    id: attr_any(result, "id").unwrap_or_default().to_string(),
                    href: attr_any(result, "href").unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(UwsJob {
        job_id: text_of(root, "jobId").unwrap_or_default(),
        owner_id: text_of(root, "ownerId").filter(|owner| !owner.is_empty()),
        phase: text_of(root, "phase")
            .map(|phase| JobPhase::from_identifier(&phase))
            .unwrap_or_default(),
        quote: text_of(root, "quote").filter(|quote| !quote.is_empty()),
        start_time: text_of(root, "startTime").as_deref().and_then(parse_instant),
        end_time: text_of(root, "endTime").as_deref().and_then(parse_instant),
        execution_duration: text_of(root, "executionDuration").and_then(|d| d.parse().ok()),
        destruction: text_of(root, "destruction").as_deref().and_then(parse_instant),
        error_summary,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"<uws:job xmlns:uws="http://www.ivoa.net/xml/UWS/v1.0"
            xmlns:xlink="http://www.w3.org/1999/xlink">
        <uws:jobId>abc123</uws:jobId>
        <uws:ownerId>anon</uws:ownerId>
        <uws:phase>COMPLETED</uws:phase>
        <uws:startTime>2024-05-01T10:00:00Z</uws:startTime>
        <uws:endTime>2024-05-01T10:02:30Z</uws:endTime>
        <uws:executionDuration>600</uws:executionDuration>
        <uws:destruction>2024-05-08T10:00:00Z</uws:destruction>
        <uws:results>
            <uws:result id="result" xlink:href="http://example.org/tap/async/abc123/results/result"/>
        </uws:results>
    </uws:job>"#;

    #[test]
    fn parses_completed_job() {
        let job = parse_job(JOB).unwrap();
        assert_eq!(job.job_id(), "abc123");
        assert_eq!(job.phase(), JobPhase::Completed);
        assert!(!job.phase().is_active());
        assert_eq!(job.execution_duration(), Some(600));
        assert_eq!(job.results().len(), 1);
        assert_eq!(
            job.results()[0].href(),
            "http://example.org/tap/async/abc123/results/result"
        );
        assert!(job.error_summary().is_none());
    }

    #[test]
    fn parses_error_summary() {
        let text = r#"<job>
            <jobId>x</jobId>
            <phase>ERROR</phase>
            <errorSummary type="fatal"><message>syntax error in query</message></errorSummary>
        </job>"#;
        let job = parse_job(text).unwrap();
        assert_eq!(job.phase(), JobPhase::Error);
        assert_eq!(job.error_summary(), Some("syntax error in query"));
    }

    #[test]
    fn unknown_phases_do_not_fail() {
        assert_eq!(JobPhase::from_identifier("SOMEDAY"), JobPhase::Unknown);
        assert_eq!(JobPhase::from_identifier("EXECUTING"), JobPhase::Executing);
    }
}
