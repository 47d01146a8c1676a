//! Authenticated client for the student API

use log::{debug, warn};
use serde_json::Value;

use super::{API_PREFIX, Credential, ERROR_SENTINEL, Reply, Transport};
use crate::auth::SessionManager;
use crate::error::{Error, Result};
use crate::models::AttachmentOwner;
use crate::sync::RecordSource;

/// Requests issued per call: the original one plus one after renewal
const MAX_ATTEMPTS: usize = 2;

/// What a reply turned out to be
enum Outcome {
    Data(Value),
    CredentialExpired,
}

/// Remote client that renews the access credential transparently
pub struct RemoteClient {
    transport: Box<dyn Transport>,
    session: SessionManager,
    expired_codes: Vec<i64>,
}

impl RemoteClient {
    pub fn new(transport: Box<dyn Transport>, session: SessionManager) -> Self {
        Self {
            transport,
            session,
            expired_codes: vec![401],
        }
    }

    /// Body `code` values that mean the access credential expired
    pub fn with_expired_codes(mut self, codes: Vec<i64>) -> Self {
        self.expired_codes = codes;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    /// GET an API path and decode the JSON body
    ///
    /// When the remote reports the access credential expired, it is renewed
    /// and the request is sent again exactly once.
    pub fn get(&mut self, path: &str) -> Result<Value> {
        for attempt in 1..=MAX_ATTEMPTS {
            let access = self.session.ensure_valid_access()?.to_string();
            let reply = self.transport.get(path, &Credential::Bearer(access))?;

            match self.classify(reply)? {
                Outcome::Data(value) => return Ok(value),
                Outcome::CredentialExpired if attempt < MAX_ATTEMPTS => {
                    debug!("Access credential expired, renewing and retrying {}", path);
                    self.session.invalidate_access()?;
                }
                Outcome::CredentialExpired => {
                    warn!("Access credential rejected right after renewal for {}", path);
                }
            }
        }

        Err(Error::Remote(format!(
            "access credential rejected after renewal for {}",
            path
        )))
    }

    /// GET an arbitrary path under the API prefix
    pub fn get_custom(&mut self, path: &str) -> Result<Value> {
        let path = if path.starts_with(API_PREFIX) {
            path.to_string()
        } else {
            format!("{}/{}", API_PREFIX, path.trim_start_matches('/'))
        };
        self.get(&path)
    }

    /// GET `alunno/{student_id}/{call}` and unwrap its `valori` field
    pub fn get_scoped(&mut self, student_id: &str, call: &str) -> Result<Value> {
        let mut body = self.get(&student_path(student_id, call))?;
        body.as_object_mut()
            .and_then(|obj| obj.remove("valori"))
            .ok_or_else(|| Error::UnexpectedShape(format!("'{}' response has no 'valori'", call)))
    }

    /// Bind the client to one student, as a record source for collections
    pub fn scoped<'a>(&'a mut self, student_id: &'a str) -> StudentScope<'a> {
        StudentScope {
            client: self,
            student_id,
        }
    }

    fn classify(&self, reply: Reply) -> Result<Outcome> {
        if reply.status == 401 {
            return Ok(Outcome::CredentialExpired);
        }

        let body: Value = serde_json::from_str(&reply.body).map_err(|_| {
            Error::Remote(format!("HTTP {} with a non-JSON body", reply.status))
        })?;

        match body {
            Value::String(s) if s == ERROR_SENTINEL => Err(Error::Remote(s)),
            Value::Object(ref obj) => {
                let expired = obj
                    .get("code")
                    .and_then(Value::as_i64)
                    .is_some_and(|code| self.expired_codes.contains(&code));
                if expired {
                    Ok(Outcome::CredentialExpired)
                } else if !(200..300).contains(&reply.status) {
                    Err(Error::Remote(format!("HTTP {}: {}", reply.status, body)))
                } else {
                    Ok(Outcome::Data(body))
                }
            }
            other => Err(Error::Remote(format!("expected a JSON object, got {}", other))),
        }
    }
}

/// Build the path of a student-scoped resource
pub(crate) fn student_path(student_id: &str, call: &str) -> String {
    format!(
        "{}/alunno/{}/{}",
        API_PREFIX,
        urlencoding::encode(student_id),
        call.trim_start_matches('/')
    )
}

/// Path of an attachment's download endpoint
pub fn attachment_path(owner: AttachmentOwner, student_id: &str, file_id: i64) -> String {
    student_path(student_id, &owner.call(file_id))
}

/// A remote client bound to one student
pub struct StudentScope<'a> {
    client: &'a mut RemoteClient,
    student_id: &'a str,
}

impl RecordSource for StudentScope<'_> {
    fn fetch(&mut self, call: &str) -> Result<Vec<Value>> {
        match self.client.get_scoped(self.student_id, call)? {
            Value::Array(values) => Ok(values),
            other => Err(Error::UnexpectedShape(format!(
                "'{}' valori is not a list: {}",
                call, other
            ))),
        }
    }
}
