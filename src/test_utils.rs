// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the Kubernetes API, external commands and the cluster.

use crate::error::{GatewayError, Result};
use crate::health::HealthProbe;
use crate::helm::{PackageOps, Release};
use crate::kubernetes::{ClusterOps, Deletion, Manifest, ResourceState, SecretSource, WaitTarget};
use crate::process::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use url::Url;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    received: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Whether a request with this method and exact path was made
    pub fn received(&self, method: &str, path: &str) -> bool {
        self.received
            .lock()
            .unwrap()
            .iter()
            .any(|(m, p)| m == method && p == path)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        self.received.lock().unwrap().push((method, path));

        Box::pin(async move {
            let (status, body) =
                response.unwrap_or_else(|| (404, status_json(404, "NotFound")));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a failure status with the given code and reason
pub fn status_json(code: u16, reason: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": reason.to_lowercase(),
        "reason": reason,
        "code": code
    })
    .to_string()
}

struct Rule {
    prefix: Vec<String>,
    remaining: Option<u32>,
    output: CommandOutput,
}

/// A command runner that records every invocation and answers from rules
/// matched on the command line prefix. Unmatched commands succeed silently.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    missing: HashSet<String>,
    invocations: Mutex<Vec<(Vec<String>, Option<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every command starting with `prefix`
    pub fn on(self, prefix: &[&str], code: i32, stdout: &str, stderr: &str) -> Self {
        self.rule(prefix, None, code, stdout, stderr)
    }

    /// Answer the first `times` commands starting with `prefix`
    pub fn on_times(self, prefix: &[&str], times: u32, code: i32, stdout: &str, stderr: &str) -> Self {
        self.rule(prefix, Some(times), code, stdout, stderr)
    }

    /// Pretend `program` is not installed
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    fn rule(self, prefix: &[&str], remaining: Option<u32>, code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            remaining,
            output: CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        });
        self
    }

    /// Every command line run so far, version checks excluded
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(argv, _)| argv.join(" "))
            .filter(|line| !line.ends_with(" version"))
            .collect()
    }

    /// Stdin given to the `index`-th recorded command, version checks excluded
    pub fn stdin_of(&self, index: usize) -> Option<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|(argv, _)| argv.last().map(String::as_str) != Some("version"))
            .nth(index)
            .and_then(|(_, stdin)| stdin.clone())
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String], stdin: Option<&[u8]>) -> Result<CommandOutput> {
        if self.missing.contains(program) {
            return Err(GatewayError::ToolMissing(program.to_string()));
        }

        let argv: Vec<String> = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect();
        self.invocations.lock().unwrap().push((
            argv.clone(),
            stdin.map(|s| String::from_utf8_lossy(s).into_owned()),
        ));

        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if rule.remaining == Some(0) || !argv.starts_with(&rule.prefix) {
                continue;
            }
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return Ok(rule.output.clone());
        }

        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    unreachable: bool,
    namespaces: BTreeSet<String>,
    secrets: BTreeMap<(String, String), Vec<u8>>,
    never_ready: Vec<WaitTarget>,
    address: Option<String>,
    address_reads: u32,
    fail_secret_create: bool,
    releases: BTreeMap<String, String>,
    health: Option<String>,
    applied: BTreeMap<String, String>,
}

/// An in-memory cluster that records calls and simulates readiness and failures
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str, data: &[u8]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.namespaces.insert(namespace.to_string());
            state
                .secrets
                .insert((namespace.to_string(), name.to_string()), data.to_vec());
        }
        self
    }

    /// `target` never becomes ready; waiting on it times out
    pub fn never_ready(self, target: WaitTarget) -> Self {
        self.state.lock().unwrap().never_ready.push(target);
        self
    }

    /// The load balancer assigns `address`
    pub fn with_address(self, address: &str) -> Self {
        self.state.lock().unwrap().address = Some(address.to_string());
        self
    }

    pub fn failing_secret_create(self) -> Self {
        self.state.lock().unwrap().fail_secret_create = true;
        self
    }

    /// Health checks fail with `message`
    pub fn unhealthy(self, message: &str) -> Self {
        self.state.lock().unwrap().health = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.state.lock().unwrap().secrets.len()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains(namespace)
    }

    /// Rendered contents of the last applied manifest with this file name
    pub fn applied(&self, file: &str) -> Option<String> {
        self.state.lock().unwrap().applied.get(file).cloned()
    }

    pub fn address_reads(&self) -> u32 {
        self.state.lock().unwrap().address_reads
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn check_access(&self) -> Result<()> {
        self.record("check_access".to_string());
        if self.state.lock().unwrap().unreachable {
            return Err(GatewayError::ClusterUnreachable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.record(format!("ensure_namespace {}", namespace));
        self.state
            .lock()
            .unwrap()
            .namespaces
            .insert(namespace.to_string());
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<Deletion> {
        self.record(format!("delete_namespace {}", namespace));
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.remove(namespace) {
            return Ok(Deletion::NotFound);
        }
        state.secrets.retain(|(ns, _), _| ns != namespace);
        state.releases.remove(namespace);
        Ok(Deletion::Deleted)
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<Deletion> {
        self.record(format!("delete_secret {}/{}", namespace, name));
        let removed = self
            .state
            .lock()
            .unwrap()
            .secrets
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(match removed {
            Some(_) => Deletion::Deleted,
            None => Deletion::NotFound,
        })
    }

    async fn create_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        self.record(format!("create_secret {}/{}", namespace, secret.name));
        let data = secret.read()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_secret_create {
            return Err(GatewayError::SecretError("admission webhook denied".to_string()));
        }
        let key = (namespace.to_string(), secret.name.clone());
        if state.secrets.contains_key(&key) {
            return Err(GatewayError::SecretError(format!(
                "secrets \"{}\" already exists",
                secret.name
            )));
        }
        state.secrets.insert(key, data);
        Ok(())
    }

    async fn apply_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        self.record(format!("apply_secret {}/{}", namespace, secret.name));
        let data = secret.read()?;
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert((namespace.to_string(), secret.name.clone()), data);
        Ok(())
    }

    async fn apply_manifest(&self, namespace: &str, manifest: &Manifest) -> Result<()> {
        let file = manifest.file_name();
        self.record(format!("apply_manifest {} {}", namespace, file));
        self.state
            .lock()
            .unwrap()
            .applied
            .insert(file, manifest.contents.clone());
        Ok(())
    }

    async fn wait_for(&self, namespace: &str, target: &WaitTarget, timeout: Duration) -> Result<()> {
        self.record(format!("wait_for {} {}", namespace, target));
        if self.state.lock().unwrap().never_ready.contains(target) {
            return Err(GatewayError::ReadinessTimeout {
                target: target.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn load_balancer_address(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        self.record(format!("load_balancer_address {}/{}", namespace, service));
        let mut state = self.state.lock().unwrap();
        state.address_reads += 1;
        Ok(state.address.clone())
    }

    async fn list_resources(&self, namespace: &str) -> Result<Vec<ResourceState>> {
        self.record(format!("list_resources {}", namespace));
        Ok(vec![ResourceState {
            kind: "Deployment".to_string(),
            name: "llm-gateway".to_string(),
            status: "1/1 ready".to_string(),
        }])
    }

    async fn logs(&self, namespace: &str, selector: &str, tail: i64) -> Result<String> {
        self.record(format!("logs {} {} {}", namespace, selector, tail));
        Ok("INFO: Uvicorn running on http://0.0.0.0:4000\n".to_string())
    }
}

#[async_trait]
impl PackageOps for FakeCluster {
    async fn upgrade_install(&self, release: &Release) -> Result<()> {
        self.record(format!("upgrade_install {} {}", release.namespace, release.name));
        self.state
            .lock()
            .unwrap()
            .releases
            .insert(release.namespace.clone(), release.name.clone());
        Ok(())
    }

    async fn release_status(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        self.record(format!("release_status {} {}", namespace, name));
        let state = self.state.lock().unwrap();
        Ok(state
            .releases
            .get(namespace)
            .filter(|release| release.as_str() == name)
            .map(|_| "deployed".to_string()))
    }
}

#[async_trait]
impl HealthProbe for FakeCluster {
    async fn check(&self, url: &Url) -> Result<u16> {
        self.record(format!("health_check {}", url));
        match self.state.lock().unwrap().health.clone() {
            Some(message) => Err(GatewayError::HealthCheckError(message)),
            None => Ok(200),
        }
    }
}

