use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::Actor;
use crate::repository::SiteConfigRepository;
use crate::storage::{ObjectStorage, Upload, SITE_FOLDER};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroSlide {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title_line1: String,
    #[serde(default)]
    pub title_line2: String,
    #[serde(default)]
    pub subtitle: String,
    pub image_url: String,
}

/// Where customers transfer their payment before uploading the proof.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankAccount {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: String,
    pub holder_name: String,
    #[serde(default)]
    pub holder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub hero_slides: Vec<HeroSlide>,
    #[serde(default)]
    pub seal_url: Option<String>,
    #[serde(default)]
    pub bank_accounts: Vec<BankAccount>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfigPatch {
    pub whatsapp_number: Option<String>,
    pub hero_slides: Option<Vec<HeroSlide>>,
    pub seal_url: Option<String>,
    pub bank_accounts: Option<Vec<BankAccount>>,
}

impl SiteConfig {
    pub fn apply(&mut self, patch: SiteConfigPatch) {
        if let Some(number) = patch.whatsapp_number {
            let number = number.trim().to_string();
            self.whatsapp_number = (!number.is_empty()).then_some(number);
        }
        if let Some(slides) = patch.hero_slides {
            self.hero_slides = slides;
        }
        if let Some(url) = patch.seal_url {
            self.seal_url = (!url.trim().is_empty()).then_some(url);
        }
        if let Some(accounts) = patch.bank_accounts {
            self.bank_accounts = accounts;
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if let Some(slide) = self.hero_slides.iter().find(|s| s.image_url.trim().is_empty()) {
            return Err(CoreError::Validation(format!("hero slide {} has no image", slide.id)));
        }
        if let Some(account) = self
            .bank_accounts
            .iter()
            .find(|a| a.bank_name.trim().is_empty() || a.account_number.trim().is_empty())
        {
            return Err(CoreError::Validation(format!(
                "bank account {} needs a bank name and number",
                account.id
            )));
        }
        Ok(())
    }
}

pub struct SiteService {
    repo: Arc<dyn SiteConfigRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl SiteService {
    pub fn new(repo: Arc<dyn SiteConfigRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { repo, storage }
    }

    pub async fn get(&self) -> CoreResult<SiteConfig> {
        Ok(self.repo.get_site_config().await?)
    }

    pub async fn update(&self, actor: &Actor, patch: SiteConfigPatch) -> CoreResult<SiteConfig> {
        actor.require_admin()?;
        let mut config = self.repo.get_site_config().await?;
        config.apply(patch);
        config.validate()?;
        self.repo.upsert_site_config(&config).await?;
        info!(admin = %actor.id, "Site configuration updated");
        Ok(config)
    }

    /// Stores the new seal image, then drops the previous one.
    pub async fn upload_seal(&self, actor: &Actor, upload: Upload) -> CoreResult<SiteConfig> {
        actor.require_admin()?;
        if upload.bytes.is_empty() {
            return Err(CoreError::Validation("seal image is empty".to_string()));
        }
        let mut config = self.repo.get_site_config().await?;
        let url = self.storage.upload(upload, SITE_FOLDER).await?;
        let previous = config.seal_url.replace(url.clone());

        if let Err(e) = self.repo.upsert_site_config(&config).await {
            if let Err(cleanup) = self.storage.delete(&url).await {
                warn!(url = %url, error = %cleanup, "Failed to remove orphaned seal image");
            }
            return Err(e.into());
        }

        if let Some(previous) = previous {
            if let Err(e) = self.storage.delete(&previous).await {
                warn!(url = %previous, error = %e, "Failed to delete previous seal image");
            }
        }
        info!(admin = %actor.id, "Seal image replaced");
        Ok(config)
    }
}
