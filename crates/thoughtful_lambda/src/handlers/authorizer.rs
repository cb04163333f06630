//! API Gateway Lambda authorizer producing IAM policy documents.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::adapters::stores::SecretsStore;
use crate::jwt;
use crate::metrics::MetricsManager;

const POLICY_VERSION: &str = "2012-10-17";
const INVOKE_ACTION: &str = "execute-api:Invoke";
const WILDCARD_RESOURCE: &str = "arn:aws:execute-api:*:*:*/*/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: &'static str,
    pub effect: Effect,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    pub context: Map<String, Value>,
}

impl AuthorizerResponse {
    fn new(
        principal_id: impl Into<String>,
        effect: Effect,
        resource: String,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION,
                statement: vec![Statement {
                    action: INVOKE_ACTION,
                    effect,
                    resource,
                }],
            },
            context,
        }
    }

    pub fn effect(&self) -> Option<Effect> {
        let statement = self.policy_document.statement.first()?;
        Some(statement.effect)
    }
}

pub struct AuthorizerDependencies<'a> {
    pub secrets: &'a dyn SecretsStore,
    pub metrics: &'a MetricsManager,
    pub region: &'a str,
}

/// `arn:aws:execute-api:{region}:{account}:{apiId}/{stage}/*`, covering every
/// route of the stage so the cached policy applies to all of them.
pub fn stage_resource_arn(event: &Value, region: &str) -> Option<String> {
    let account_id = event
        .get("methodArn")
        .and_then(Value::as_str)
        .and_then(|arn| arn.split(':').nth(4))
        .filter(|account| !account.is_empty())?;
    let context = event.get("requestContext")?;
    let api_id = context
        .get("apiId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())?;
    let stage = context
        .get("stage")
        .and_then(Value::as_str)
        .filter(|stage| !stage.is_empty())?;
    let arn = format!("arn:aws:execute-api:{region}:{account_id}:{api_id}/{stage}/*");
    Some(arn)
}

fn bearer_token(event: &Value) -> Option<&str> {
    let headers = event.get("headers")?;
    let header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .and_then(Value::as_str)?;
    header.split(' ').nth(1).filter(|token| !token.is_empty())
}

pub fn handle_authorizer_event(
    event: &Value,
    deps: &AuthorizerDependencies<'_>,
) -> AuthorizerResponse {
    let Some(resource) = stage_resource_arn(event, deps.region) else {
        tracing::error!(component = "authorizer", event = "resource_arn_unavailable");
        return AuthorizerResponse::new(
            "user",
            Effect::Deny,
            WILDCARD_RESOURCE.to_string(),
            Map::new(),
        );
    };

    let deny = |reason: &str| {
        tracing::warn!(component = "authorizer", event = "authorization_denied", reason = %reason);
        deps.metrics.put_metric("AuthorizationFailure", 1.0);
        AuthorizerResponse::new("user", Effect::Deny, resource.clone(), Map::new())
    };

    let Some(token) = bearer_token(event) else {
        return deny("missing bearer token");
    };
    let secret = match deps.secrets.jwt_secret() {
        Ok(secret) => secret,
        Err(error) => return deny(&format!("jwt secret unavailable: {error}")),
    };
    let claims = match jwt::verify_token(token, &secret) {
        Ok(claims) => claims,
        Err(error) => return deny(&error.to_string()),
    };
    let user_id = match jwt::subject(&claims) {
        Ok(user_id) => user_id,
        Err(error) => return deny(&error.to_string()),
    };

    deps.metrics.put_metric("AuthorizationSuccess", 1.0);
    tracing::info!(component = "authorizer", event = "authorization_allowed", user_id = %user_id);
    AuthorizerResponse::new(user_id, Effect::Allow, resource, claims)
}
