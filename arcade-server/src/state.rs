use std::sync::Arc;

use arcade_crypto::{AccessTokenizer, HmacSigner};
use arcade_db::ArcadeDb;
use arcade_env::Config;

use crate::checkout::CheckoutProviderT;
use crate::mail::MailSenderT;
use crate::run_session::RunSessionGate;

const STARTER_FREE_CREDITS: i64 = 3;

/// Aggregates every shared service a request handler might need, mirroring
/// the reference backend's application context: everything here is cheap
/// to clone (an `Arc` or a plain value) so it can be handed to `axum` as
/// `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: ArcadeDb,
    pub signer: Arc<HmacSigner>,
    pub tokenizer: Arc<AccessTokenizer>,
    pub run_sessions: Arc<RunSessionGate>,
    pub mail: Arc<dyn MailSenderT>,
    pub checkout: Arc<dyn CheckoutProviderT>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: ArcadeDb,
        config: Config,
        mail: Arc<dyn MailSenderT>,
        checkout: Arc<dyn CheckoutProviderT>,
    ) -> Self {
        let signer = Arc::new(HmacSigner::new(
            config.save_session_secret.as_bytes().to_vec(),
            config.leaderboard_session_secret.as_bytes().to_vec(),
            config.continue_token_secret.as_bytes().to_vec(),
        ));
        let tokenizer = Arc::new(AccessTokenizer::new(config.jwt_access_secret.as_bytes(), 15 * 60));
        let run_sessions = Arc::new(RunSessionGate::new(signer.clone()));

        Self {
            db,
            signer,
            tokenizer,
            run_sessions,
            mail,
            checkout,
            config: Arc::new(config),
        }
    }

    pub fn starter_free_credits(&self) -> i64 {
        STARTER_FREE_CREDITS
    }
}
