use async_trait::async_trait;

/// Abstract payment-checkout collaborator. The real provider lives outside
/// this repo; this trait is the seam a production deployment fills in.
#[async_trait]
pub trait CheckoutProviderT: Send + Sync {
    async fn create_checkout_session(
        &self,
        account_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> anyhow::Result<String>;
}

/// Deterministic in-repo fake used both as the default runtime
/// implementation (until a real provider is configured) and in tests.
pub struct FakeCheckoutProvider {
    pub base_url: String,
}

#[async_trait]
impl CheckoutProviderT for FakeCheckoutProvider {
    async fn create_checkout_session(
        &self,
        account_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> anyhow::Result<String> {
        Ok(format!(
            "{}/checkout/{account_id}/{price_id}?success={}&cancel={}",
            self.base_url, success_url, cancel_url
        ))
    }
}
