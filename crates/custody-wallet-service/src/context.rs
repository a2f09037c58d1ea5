//! Wallet context
//!
//! Explicit context object holding the injected collaborators (secure store,
//! KDFs, random source, clock, authentication gateway). Built once at app
//! start and passed by reference.

use crate::clock::{Clock, SystemClock};
use crate::quickpay::{Decision, QuickPayEngine};
use crate::{Error, Result};
use custody_core::codec::{self, Phrase};
use custody_core::{
    Argon2id, EntropySize, OsRandom, PasswordKdf, Pbkdf2Sha256, SecureRandom, SurrogatePhrase,
    TransformEngine,
};
use custody_params::CoreConfig;
use custody_storage::{
    save_json, AuthGateway, AuthMechanism, CosmeticPhrase, MnemonicVault, SecureStore,
    StorageKeys, VaultRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const REVEAL_REASON: &str = "Reveal recovery phrase";

/// Result of creating a wallet
#[derive(Debug, Clone)]
pub struct WalletSetup {
    /// Password-bound backup phrase for the user to write down
    pub surrogate: SurrogatePhrase,
    /// Cosmetic phrase for display before authentication
    pub display_phrase: CosmeticPhrase,
}

/// Builder for [`WalletContext`]
pub struct WalletContextBuilder {
    config: CoreConfig,
    store: Arc<dyn SecureStore>,
    gateway: Arc<AuthGateway>,
    rng: Arc<dyn SecureRandom>,
    clock: Arc<dyn Clock>,
    keystream_kdf: Option<Arc<dyn PasswordKdf>>,
    vault_kdf: Option<Arc<dyn PasswordKdf>>,
}

impl WalletContextBuilder {
    /// Override the random source
    pub fn rng(mut self, rng: Arc<dyn SecureRandom>) -> Self {
        self.rng = rng;
        self
    }

    /// Override the clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the keystream KDF (PBKDF2-HMAC-SHA256 by default)
    pub fn keystream_kdf(mut self, kdf: Arc<dyn PasswordKdf>) -> Self {
        self.keystream_kdf = Some(kdf);
        self
    }

    /// Override the vault KDF (Argon2id by default)
    pub fn vault_kdf(mut self, kdf: Arc<dyn PasswordKdf>) -> Self {
        self.vault_kdf = Some(kdf);
        self
    }

    /// Validate the configuration and load persisted state
    pub async fn build(self) -> Result<WalletContext> {
        self.config.validate()?;
        let params = self.config.kdf;

        let keystream_kdf = self.keystream_kdf.unwrap_or_else(|| Arc::new(Pbkdf2Sha256));
        let vault_kdf = self
            .vault_kdf
            .unwrap_or_else(|| Arc::new(Argon2id::from_params(&params)));

        let transform = TransformEngine::new(
            keystream_kdf,
            self.rng.clone(),
            params.keystream_iterations,
            self.config.salt_size,
        );
        let vault = MnemonicVault::new(vault_kdf, self.rng.clone(), params.vault_iterations);

        let keys = StorageKeys::for_wallet(&self.config.wallet_id);
        let quick_pay = QuickPayEngine::load(
            self.store.clone(),
            keys.quick_pay_key(),
            self.gateway.clone(),
            self.clock.clone(),
        )
        .await?;

        info!(
            "Wallet context ready (wallet={}, profile={:?})",
            self.config.wallet_id, self.config.kdf_profile
        );
        Ok(WalletContext {
            config: self.config,
            keys,
            store: self.store,
            gateway: self.gateway,
            rng: self.rng,
            clock: self.clock,
            transform,
            vault,
            quick_pay,
            vault_lock: Mutex::new(()),
        })
    }
}

/// Wallet context for one wallet instance
pub struct WalletContext {
    config: CoreConfig,
    keys: StorageKeys,
    store: Arc<dyn SecureStore>,
    gateway: Arc<AuthGateway>,
    rng: Arc<dyn SecureRandom>,
    clock: Arc<dyn Clock>,
    transform: TransformEngine,
    vault: MnemonicVault,
    quick_pay: QuickPayEngine,
    vault_lock: Mutex<()>,
}

impl WalletContext {
    /// Start building a context with the required collaborators
    pub fn builder(
        config: CoreConfig,
        store: Arc<dyn SecureStore>,
        gateway: Arc<AuthGateway>,
    ) -> WalletContextBuilder {
        WalletContextBuilder {
            config,
            store,
            gateway,
            rng: Arc::new(OsRandom),
            clock: Arc::new(SystemClock),
            keystream_kdf: None,
            vault_kdf: None,
        }
    }

    /// Probe authentication mechanisms using the configured prompt timeout
    pub async fn resolve_gateway(
        config: &CoreConfig,
        primary: Arc<dyn AuthMechanism>,
        secondary: Option<Arc<dyn AuthMechanism>>,
    ) -> AuthGateway {
        let timeout = Duration::from_millis(config.auth_timeout_ms);
        AuthGateway::resolve(primary, secondary, timeout).await
    }

    /// Fresh random wallet id
    pub fn generate_wallet_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Storage keys owned by this wallet
    pub fn storage_keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Mnemonic transform engine
    pub fn transform_engine(&self) -> &TransformEngine {
        &self.transform
    }

    /// Mnemonic vault
    pub fn vault(&self) -> &MnemonicVault {
        &self.vault
    }

    /// Authentication gateway
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    /// Quick-pay policy engine
    pub fn quick_pay(&self) -> &QuickPayEngine {
        &self.quick_pay
    }

    /// Clock
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Evaluate an outgoing payment against the quick-pay policy
    pub async fn evaluate_payment(&self, amount: u64, recipient: Option<&str>) -> Result<Decision> {
        self.quick_pay.evaluate(amount, recipient).await
    }

    /// Check if a vault record is stored
    pub async fn has_wallet(&self) -> Result<bool> {
        Ok(self.store.get(&self.keys.vault_key()).await?.is_some())
    }

    /// Create a wallet with fresh entropy
    ///
    /// Seals the phrase in the vault and returns the surrogate backup phrase
    /// bound to the same password.
    pub async fn create_wallet(&self, size: EntropySize, password: &str) -> Result<WalletSetup> {
        let _guard = self.vault_lock.lock().await;
        if self.has_wallet().await? {
            return Err(Error::WalletExists);
        }

        let phrase = codec::generate(size, self.rng.as_ref())?;
        let surrogate = self.transform.transform(&phrase, password)?;
        let record = self.vault.seal(&phrase, password)?;
        self.save_record(&record).await?;
        let display_phrase = self.vault.display_phrase(&record)?;

        info!(
            "Wallet created ({} words, surrogate {} words)",
            phrase.len(),
            surrogate.len()
        );
        Ok(WalletSetup {
            surrogate,
            display_phrase,
        })
    }

    /// Create a wallet with the configured default entropy size
    pub async fn create_default_wallet(&self, password: &str) -> Result<WalletSetup> {
        self.create_wallet(self.config.default_entropy_size, password)
            .await
    }

    /// Restore a wallet from a surrogate phrase and seal it
    ///
    /// Replaces any stored record.
    pub async fn import_surrogate(
        &self,
        surrogate: &SurrogatePhrase,
        password: &str,
    ) -> Result<CosmeticPhrase> {
        let _guard = self.vault_lock.lock().await;
        let phrase = self.transform.restore(surrogate, password)?;
        let record = self.vault.seal(&phrase, password)?;
        self.save_record(&record).await?;

        info!("Wallet imported from surrogate ({} words)", phrase.len());
        Ok(self.vault.display_phrase(&record)?)
    }

    /// Authenticate, then decrypt the stored phrase
    pub async fn reveal_phrase(&self, password: &str) -> Result<Phrase> {
        let _guard = self.vault_lock.lock().await;
        self.gateway.prompt(REVEAL_REASON).await?;
        self.quick_pay.note_authenticated();

        let record = self.load_record().await?;
        let phrase = self.vault.open(&record, password)?;
        debug!("Recovery phrase revealed");
        Ok(phrase)
    }

    /// Authenticate, then produce a fresh surrogate backup of the stored phrase
    pub async fn backup_surrogate(&self, password: &str) -> Result<SurrogatePhrase> {
        let phrase = self.reveal_phrase(password).await?;
        Ok(self.transform.transform(&phrase, password)?)
    }

    /// Cosmetic phrase of the stored record
    pub async fn display_phrase(&self) -> Result<CosmeticPhrase> {
        let record = self.load_record().await?;
        Ok(self.vault.display_phrase(&record)?)
    }

    /// Re-seal the stored phrase under a new password
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let _guard = self.vault_lock.lock().await;
        let record = self.load_record().await?;
        let rekeyed = self.vault.rekey(&record, old_password, new_password)?;
        self.save_record(&rekeyed).await
    }

    /// Remove every key this wallet owns
    pub async fn delete_wallet(&self) -> Result<()> {
        let _guard = self.vault_lock.lock().await;
        self.store.delete(&self.keys.vault_key()).await?;
        self.quick_pay.reset().await?;
        info!("Wallet deleted");
        Ok(())
    }

    async fn load_record(&self) -> Result<VaultRecord> {
        let raw = self
            .store
            .get(&self.keys.vault_key())
            .await?
            .ok_or(Error::NotInitialized)?;
        Ok(VaultRecord::from_json(&raw)?)
    }

    async fn save_record(&self, record: &VaultRecord) -> Result<()> {
        save_json(self.store.as_ref(), &self.keys.vault_key(), record).await?;
        Ok(())
    }
}
