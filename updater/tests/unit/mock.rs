//! Scripted device for driving the pipeline without a network

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use dynupd::errors::TransportError;
use dynupd::models::device::Device;
use dynupd::models::package::PackageKind;
use dynupd::xapi::client::DeviceApi;

pub const SUCCESS: &str = r#"<response status="success"><result><msg>ok</msg></result></response>"#;

pub const ERROR_ENVELOPE: &str = r#"<response status="error" code="17"><msg><line>Invalid file</line></msg></response>"#;

pub const INSTALL_ACCEPTED: &str = r#"<response status="success" code="19"><result>
    <msg><line>Content install job enqueued with jobid 812</line></msg>
    <job>812</job>
</result></response>"#;

/// `show system info` response reporting `version` for every content kind
pub fn system_info(version: &str) -> String {
    format!(
        r#"<response status="success"><result><system>
            <hostname>fw</hostname>
            <app-version>{v}</app-version>
            <threat-version>{v}</threat-version>
            <av-version>{v}</av-version>
            <wildfire-version>{v}</wildfire-version>
        </system></result></response>"#,
        v = version
    )
}

/// `show jobs id` response
pub fn job(id: &str, status: &str, progress: u8, result: &str, next: Option<&str>) -> String {
    let next = next
        .map(|n| format!("<nextjob>{}</nextjob>", n))
        .unwrap_or_default();
    format!(
        r#"<response status="success"><result><job>
            <id>{id}</id>
            <type>Content</type>
            <status>{status}</status>
            <result>{result}</result>
            <progress>{progress}</progress>
            <details><line>step</line></details>
            {next}
        </job></result></response>"#
    )
}

pub fn device(hostname: &str, package: PackageKind) -> Device {
    Device::new(
        hostname,
        format!("fw-{}", hostname),
        SecretString::from("secret".to_string()),
        Duration::from_secs(30),
        package,
    )
}

/// Answers each command kind from a script and records every call
pub struct ScriptedDevice {
    system_info: Option<String>,
    install_response: String,
    import_response: Option<String>,
    jobs: Mutex<VecDeque<Result<String, TransportError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    pub fn new(installed_version: &str) -> Self {
        Self {
            system_info: Some(system_info(installed_version)),
            install_response: INSTALL_ACCEPTED.to_string(),
            import_response: Some(SUCCESS.to_string()),
            jobs: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Device that refuses the version check
    pub fn unreachable() -> Self {
        Self {
            system_info: None,
            ..Self::new("0")
        }
    }

    /// Job status responses, returned in order; once drained the job stays running
    pub fn with_jobs(self, jobs: Vec<String>) -> Self {
        self.with_job_results(jobs.into_iter().map(Ok).collect())
    }

    /// Like [`ScriptedDevice::with_jobs`], with transport failures mixed in
    pub fn with_job_results(self, jobs: Vec<Result<String, TransportError>>) -> Self {
        *self.jobs.lock().unwrap() = jobs.into();
        self
    }

    pub fn with_install_response(mut self, response: &str) -> Self {
        self.install_response = response.to_string();
        self
    }

    /// Import answers with `response`, or fails in transport when `None`
    pub fn with_import_response(mut self, response: Option<&str>) -> Self {
        self.import_response = response.map(str::to_string);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl DeviceApi for ScriptedDevice {
    async fn op(&self, cmd_xml: &str) -> Result<String, TransportError> {
        if cmd_xml.contains("<system>") {
            self.calls.lock().unwrap().push("system".to_string());
            return self.system_info.clone().ok_or(TransportError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }

        if cmd_xml.contains("<install>") {
            self.calls.lock().unwrap().push(format!("install {}", cmd_xml));
            return Ok(self.install_response.clone());
        }

        if cmd_xml.contains("<jobs>") {
            self.calls.lock().unwrap().push(format!("job {}", cmd_xml));
            let next = self.jobs.lock().unwrap().pop_front();
            return next.unwrap_or_else(|| Ok(job("0", "ACT", 50, "PEND", None)));
        }

        Err(TransportError::Other(format!("unexpected command {}", cmd_xml)))
    }

    async fn import(
        &self,
        category: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("import {} {} {}", category, file_name, contents.len()));
        self.import_response.clone().ok_or(TransportError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        })
    }
}
