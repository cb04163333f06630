use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use thoughtful_core::entry_point::{self, EntryPoint};
use thoughtful_core::throttle::ThrottlePolicy;
use thoughtful_lambda::adapters::chatbot::GeminiChatBot;
use thoughtful_lambda::adapters::dynamodb::{
    DynamoFirstSolutionStore, DynamoLearningEntryStore, DynamoPermissionStore,
    DynamoPrimmSubmissionStore, DynamoRefreshTokenStore, DynamoSecretsStore, DynamoThrottleStore,
    DynamoUserProfileStore, DynamoUserProgressStore,
};
use thoughtful_lambda::adapters::google::HttpGoogleTokenVerifier;
use thoughtful_lambda::config::{
    from_env, AuthConfig, AuthorizerConfig, InstructorPortalConfig, LearningEntriesConfig,
    PrimmFeedbackConfig, UserProgressConfig,
};
use thoughtful_lambda::handlers::auth::{handle_auth_event, AuthDependencies};
use thoughtful_lambda::handlers::authorizer::{handle_authorizer_event, AuthorizerDependencies};
use thoughtful_lambda::handlers::instructor_portal::{
    handle_instructor_portal_event, InstructorPortalDependencies,
};
use thoughtful_lambda::handlers::learning_entries::{
    handle_learning_entries_event, LearningEntriesDependencies,
};
use thoughtful_lambda::handlers::primm_feedback::{
    handle_primm_feedback_event, PrimmFeedbackDependencies,
};
use thoughtful_lambda::handlers::user_progress::{
    handle_user_progress_event, UserProgressDependencies,
};
use thoughtful_lambda::metrics::{MetricsManager, AUTH_NAMESPACE};
use tracing_subscriber::EnvFilter;

struct Clients {
    dynamodb: aws_sdk_dynamodb::Client,
    http: reqwest::Client,
}

async fn handle_request(
    entry: EntryPoint,
    clients: &Clients,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let payload = event.payload;
    let now = Utc::now();
    let dynamodb = || clients.dynamodb.clone();
    tracing::info!(
        event = "invocation_started",
        entry_point = %entry,
        request_id = %event.context.request_id,
    );

    let response = match entry {
        EntryPoint::Auth => {
            let config = AuthConfig::load(&from_env)?;
            let secrets = DynamoSecretsStore::new(dynamodb(), config.secrets_table);
            let refresh_tokens =
                DynamoRefreshTokenStore::new(dynamodb(), config.refresh_token_table);
            let profiles = DynamoUserProfileStore::new(dynamodb(), config.user_profile_table);
            let google =
                HttpGoogleTokenVerifier::new(clients.http.clone(), config.google_client_id);
            let metrics = MetricsManager::for_service(AUTH_NAMESPACE, entry.reference());
            let deps = AuthDependencies {
                secrets: &secrets,
                refresh_tokens: &refresh_tokens,
                profiles: &profiles,
                google: &google,
                metrics: &metrics,
            };
            let response = handle_auth_event(&payload, &deps, now);
            metrics.flush();
            serde_json::to_value(response)?
        }
        EntryPoint::Authorizer => {
            let config = AuthorizerConfig::load(&from_env)?;
            let secrets = DynamoSecretsStore::new(dynamodb(), config.secrets_table);
            let metrics = MetricsManager::for_service(AUTH_NAMESPACE, entry.reference());
            let deps = AuthorizerDependencies {
                secrets: &secrets,
                metrics: &metrics,
                region: &config.region,
            };
            let response = handle_authorizer_event(&payload, &deps);
            metrics.flush();
            serde_json::to_value(response)?
        }
        EntryPoint::UserProgress => {
            let config = UserProgressConfig::load(&from_env)?;
            let progress = DynamoUserProgressStore::new(dynamodb(), config.user_progress_table);
            let first_solutions =
                DynamoFirstSolutionStore::new(dynamodb(), config.first_solutions_table);
            let deps = UserProgressDependencies {
                progress: &progress,
                first_solutions: &first_solutions,
            };
            serde_json::to_value(handle_user_progress_event(&payload, &deps, now))?
        }
        EntryPoint::LearningEntries => {
            let config = LearningEntriesConfig::load(&from_env)?;
            let entries = DynamoLearningEntryStore::new(dynamodb(), config.learning_entries_table);
            let throttle = DynamoThrottleStore::new(dynamodb(), config.throttle_table);
            let secrets = DynamoSecretsStore::new(dynamodb(), config.secrets_table);
            let chatbot = GeminiChatBot::new(clients.http.clone());
            let deps = LearningEntriesDependencies {
                entries: &entries,
                throttle: &throttle,
                secrets: &secrets,
                chatbot: &chatbot,
                throttle_policy: ThrottlePolicy::default(),
            };
            serde_json::to_value(handle_learning_entries_event(&payload, &deps, now))?
        }
        EntryPoint::PrimmFeedback => {
            let config = PrimmFeedbackConfig::load(&from_env)?;
            let submissions =
                DynamoPrimmSubmissionStore::new(dynamodb(), config.primm_submissions_table);
            let throttle = DynamoThrottleStore::new(dynamodb(), config.throttle_table);
            let secrets = DynamoSecretsStore::new(dynamodb(), config.secrets_table);
            let chatbot = GeminiChatBot::new(clients.http.clone());
            let metrics = MetricsManager::for_service(AUTH_NAMESPACE, entry.reference());
            let deps = PrimmFeedbackDependencies {
                submissions: &submissions,
                throttle: &throttle,
                secrets: &secrets,
                chatbot: &chatbot,
                metrics: &metrics,
                throttle_policy: ThrottlePolicy::default(),
            };
            let response = handle_primm_feedback_event(&payload, &deps, now);
            metrics.flush();
            serde_json::to_value(response)?
        }
        EntryPoint::InstructorPortal => {
            let config = InstructorPortalConfig::load(&from_env)?;
            let permissions = DynamoPermissionStore::new(dynamodb(), config.user_permissions_table);
            let progress = DynamoUserProgressStore::new(dynamodb(), config.user_progress_table);
            let entries = DynamoLearningEntryStore::new(dynamodb(), config.learning_entries_table);
            let submissions =
                DynamoPrimmSubmissionStore::new(dynamodb(), config.primm_submissions_table);
            let first_solutions =
                DynamoFirstSolutionStore::new(dynamodb(), config.first_solutions_table);
            let deps = InstructorPortalDependencies {
                permissions: &permissions,
                progress: &progress,
                entries: &entries,
                submissions: &submissions,
                first_solutions: &first_solutions,
            };
            serde_json::to_value(handle_instructor_portal_event(&payload, &deps))?
        }
    };
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(true)
        .without_time()
        .try_init()
        .ok();

    let handler_env = std::env::var("_HANDLER").ok();
    let entry = match entry_point::resolve(handler_env.as_deref(), std::env::args().skip(1)) {
        Ok(entry) => entry,
        Err(error) => {
            tracing::error!(event = "entry_point_unresolved", error = %error);
            return Err(error.into());
        }
    };
    tracing::info!(event = "entry_point_resolved", entry_point = %entry);

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let clients = Clients {
        dynamodb: aws_sdk_dynamodb::Client::new(&aws_config),
        http: reqwest::Client::new(),
    };
    let clients = &clients;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(entry, clients, event).await
    }))
    .await
}
