//! Command implementations behind the CLI

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};

use crate::api::{destiny, ApiClient, NetworkStatus, ReqwestFetcher};
use crate::auth::{
    authorize_url, has_token_expired, AuthConfig, FileTokenStore, Grant, HttpTokenExchange,
    Token, TokenAcquirer, TokenStore,
};
use crate::config::Settings;
use crate::manifest::{ManifestService, TableName};
use crate::models::DestinyAccount;

/// Everything a command needs, wired once per process.
pub struct Session {
    settings: Settings,
    store: Arc<FileTokenStore>,
    tokens: Arc<TokenAcquirer>,
    network: NetworkStatus,
}

impl Session {
    pub fn open(settings: Settings) -> Result<Self> {
        let store = Arc::new(FileTokenStore::open_default()?);
        tracing::debug!("Token store at {}", store.path().display());
        if settings.client_secret.is_some() {
            tracing::debug!(
                "OAuth client secret is configured; token exchanges still go through {}",
                settings.token_exchange_url
            );
        }
        let exchange = Arc::new(HttpTokenExchange::new(settings.token_exchange_url.clone()));
        let tokens = Arc::new(TokenAcquirer::new(store.clone(), exchange));
        Ok(Self {
            settings,
            store,
            tokens,
            network: NetworkStatus::new(),
        })
    }

    fn authenticated_client(&self) -> ApiClient {
        ApiClient::authenticated(
            &self.settings.api_key,
            &self.settings.api_base_url,
            self.tokens.clone(),
            self.network.clone(),
        )
    }

    fn public_client(&self) -> ApiClient {
        ApiClient::unauthenticated(
            &self.settings.api_key,
            &self.settings.api_base_url,
            self.network.clone(),
        )
    }

    fn manifest_service(&self) -> ManifestService {
        ManifestService::new(
            self.public_client(),
            Arc::new(ReqwestFetcher::new()),
            self.settings.manifest_language.clone(),
        )
    }

    /// Reuse or refresh stored credentials, else print the browser login URL.
    pub async fn login(&self, force: bool) -> Result<()> {
        if !force {
            if let Some(tokens) = self.store.get_token() {
                if tokens.access_token.as_ref().map_or(false, |t| !has_token_expired(t)) {
                    println!("Already logged in (access token valid). Use --force to re-authenticate.");
                    return Ok(());
                }
                tracing::info!("Access token missing or expired, attempting refresh...");
                match self.tokens.acquire(Grant::Ambient).await {
                    Ok(_) => {
                        println!("Token refreshed successfully.");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!("Refresh failed, falling back to browser login: {}", e);
                    }
                }
            }
        }

        let (url, state) = authorize_url(&AuthConfig::new(self.settings.client_id.clone()))?;
        println!();
        println!("To sign in, visit: {}", url);
        println!("State:             {}", state.secret());
        println!();
        println!("After approving, copy the 'code' parameter from the redirect and run:");
        println!("  guardian-cli redeem --code <code>");
        Ok(())
    }

    /// Trade an authorization code or a refresh token for a new token pair.
    pub async fn redeem(&self, code: Option<String>, refresh_token: Option<String>) -> Result<()> {
        let grant = Grant::from_parts(code, refresh_token)?;
        let tokens = self
            .tokens
            .acquire(grant)
            .await
            .context("Token exchange failed")?;
        println!("Login successful.");
        println!("Bungie.net membership: {}", tokens.bungie_membership_id);
        Ok(())
    }

    /// Refresh using the stored refresh token, even if the access token is valid.
    pub async fn refresh(&self) -> Result<()> {
        let refresh = self
            .store
            .get_token()
            .and_then(|t| t.refresh_token)
            .context("No refresh token stored. Run 'guardian-cli login'.")?;
        if has_token_expired(&refresh) {
            bail!("Refresh token expired. Run 'guardian-cli login'.");
        }

        self.tokens
            .acquire(Grant::RefreshToken(refresh.value))
            .await
            .context("Token refresh failed")?;
        println!("Token refreshed successfully.");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove_token()?;
        println!("Logged out.");
        Ok(())
    }

    pub fn status(&self) {
        let Some(tokens) = self.store.get_token() else {
            println!("Access token:  none");
            println!("Refresh token: none");
            println!("\nRun 'guardian-cli login' to authenticate.");
            return;
        };

        println!("Membership:    {}", tokens.bungie_membership_id);
        print_token_status("Access token: ", tokens.access_token.as_ref());
        print_token_status("Refresh token:", tokens.refresh_token.as_ref());
    }

    /// Show the Bungie.net user and their Destiny memberships.
    pub async fn whoami(&self) -> Result<()> {
        let client = self.authenticated_client();
        let data = destiny::get_membership_data_for_current_user(&client).await?;

        println!();
        println!(
            "Display Name: {}",
            data.bungie_net_user.display_name.as_deref().unwrap_or("(none)")
        );
        println!(
            "Unique Name:  {}",
            data.bungie_net_user.unique_name.as_deref().unwrap_or("(none)")
        );
        println!("ID:           {}", data.bungie_net_user.membership_id);
        for membership in &data.destiny_memberships {
            println!(
                "  {:<12} {}",
                membership.membership_type.label(),
                membership.membership_id
            );
        }
        Ok(())
    }

    /// List the Destiny accounts linked to the logged-in user.
    pub async fn accounts(&self) -> Result<()> {
        let client = self.authenticated_client();
        let data = destiny::get_membership_data_for_current_user(&client).await?;
        let accounts =
            destiny::get_destiny_accounts(&client, &data.bungie_net_user.membership_id).await?;

        if accounts.is_empty() {
            println!("No Destiny accounts found.");
            return Ok(());
        }
        for account in &accounts {
            print_account(account);
        }
        Ok(())
    }

    /// Print the items the current characters carry, named from the manifest.
    pub async fn inventory(&self) -> Result<()> {
        let client = self.authenticated_client();
        let data = destiny::get_membership_data_for_current_user(&client).await?;
        let bnet_id = data.bungie_net_user.membership_id.clone();

        let manifest_service = self.manifest_service();
        let (membership, defs) = tokio::join!(
            destiny::choose_membership(&client, data.destiny_memberships),
            manifest_service.get_manifest_definitions(&[TableName::InventoryItem]),
        );
        let membership = membership.context("No Destiny membership found for this user")?;
        let defs = defs?;

        let accounts = destiny::get_destiny_accounts(&client, &bnet_id).await?;
        let account = accounts
            .iter()
            .find(|a| a.membership_id == membership.membership_id)
            .context("Selected membership is not among the linked profiles")?;

        let items = destiny::get_character_inventory_items(&client, account)
            .await
            .context("Could not load character inventories")?;
        let table = defs
            .inventory_item()
            .context("Inventory item definitions were not loaded")?;

        println!("{} ({})", account.display_name, account.platform_label);
        for item in &items {
            match table.get_for(item.item_hash, "inventory") {
                Ok(def) => println!("  {:>4}x {}", item.quantity, def.display_properties.name),
                Err(e) => println!("  {:>4}x <{}>", item.quantity, e),
            }
        }
        println!("{} items", items.len());
        Ok(())
    }

    /// Print one manifest record as JSON.
    pub async fn lookup(&self, table: TableName, hash: u32) -> Result<()> {
        let defs = self.manifest_service().get_manifest_definitions(&[table]).await?;
        let record = defs
            .lookup_json(table, hash)
            .with_context(|| format!("Table {} was not loaded", table))??;
        println!("{}", serde_json::to_string_pretty(&record)?);
        Ok(())
    }
}

fn print_token_status(label: &str, token: Option<&Token>) {
    match token {
        Some(token) => {
            let state = if has_token_expired(token) { "expired" } else { "valid" };
            println!("{} {}", label, state);
            if let Some(at) = Utc.timestamp_millis_opt(token.expires_at()).single() {
                println!("  expires_at: {}", at.to_rfc3339());
            }
        }
        None => println!("{} none", label),
    }
}

fn print_account(account: &DestinyAccount) {
    let platforms: Vec<&str> = account.platforms.iter().map(|p| p.label()).collect();
    let last_played = account
        .last_played
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<24} {:<12} {:<20} last played {}  [{}]",
        account.display_name,
        account.platform_label,
        account.membership_id,
        last_played,
        platforms.join(", ")
    );
}
