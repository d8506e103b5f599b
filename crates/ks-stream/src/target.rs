//! Request paths for attach and exec

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::form_urlencoded;

/// Bytes left as-is in a path segment (RFC 3986 unreserved)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Which standard streams are requested from the server
///
/// Each flag reflects whether the matching local endpoint was supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFlags {
    pub stdout: bool,
    pub stderr: bool,
    pub stdin: bool,
    pub tty: bool,
}

impl StreamFlags {
    /// Flags as query parameters, in alphabetical order
    pub fn query(&self) -> String {
        format!(
            "stderr={}&stdin={}&stdout={}&tty={}",
            self.stderr, self.stdin, self.stdout, self.tty
        )
    }
}

/// The container process to connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Attach to the running main process of a container
    Attach {
        namespace: String,
        pod: String,
        container: String,
    },
    /// Start a new process in a container
    Exec {
        namespace: String,
        pod: String,
        container: String,
        command: Vec<String>,
    },
}

impl Target {
    pub fn attach(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Target::Attach {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
        }
    }

    pub fn exec<I, S>(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
        command: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target::Exec {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Path and query string for this target
    ///
    /// Query parameters are ordered alphabetically: `command` (exec only,
    /// one per argument), `container`, then the stream flags.
    pub fn request_path(&self, flags: &StreamFlags) -> String {
        match self {
            Target::Attach {
                namespace,
                pod,
                container,
            } => format!(
                "/api/v1/namespaces/{}/pods/{}/attach?container={}&{}",
                segment(namespace),
                segment(pod),
                encode(container),
                flags.query()
            ),
            Target::Exec {
                namespace,
                pod,
                container,
                command,
            } => {
                let mut query = String::new();
                for arg in command {
                    query.push_str("command=");
                    query.push_str(&encode(arg));
                    query.push('&');
                }
                format!(
                    "/api/v1/namespaces/{}/pods/{}/exec?{}container={}&{}",
                    segment(namespace),
                    segment(pod),
                    query,
                    encode(container),
                    flags.query()
                )
            }
        }
    }
}

fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
