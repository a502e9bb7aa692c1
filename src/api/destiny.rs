//! Destiny 2 account and profile queries

use chrono::Utc;
use futures::future::join_all;

use super::classify::ErrorCategory;
use super::client::ApiClient;
use super::error::{ApiError, ServiceError};
use crate::models::{
    format_bungie_name, BungieMembershipType, DestinyAccount, DestinyComponentType,
    DestinyItemComponent, DestinyLinkedProfilesResponse, DestinyProfileResponse, UserInfoCard,
    UserMembershipData,
};

/// Components needed to show a user's inventory.
pub const STORES_COMPONENTS: &[DestinyComponentType] = &[
    DestinyComponentType::Profiles,
    DestinyComponentType::ProfileInventories,
    DestinyComponentType::ProfileCurrencies,
    DestinyComponentType::Characters,
    DestinyComponentType::CharacterInventories,
    DestinyComponentType::CharacterEquipment,
    DestinyComponentType::ItemStats,
    DestinyComponentType::ItemInstances,
    DestinyComponentType::ItemPerks,
    DestinyComponentType::ItemSockets,
    DestinyComponentType::ItemPlugStates,
    DestinyComponentType::Collectibles,
    DestinyComponentType::CharacterLoadouts,
];

/// Memberships of the logged-in user.
pub async fn get_membership_data_for_current_user(
    client: &ApiClient,
) -> Result<UserMembershipData, ServiceError> {
    client
        .get("/Platform/User/GetMembershipsForCurrentUser/", &[])
        .await
}

/// Raw profile call; `components` selects what comes back.
pub async fn get_profile_raw(
    client: &ApiClient,
    membership_type: BungieMembershipType,
    membership_id: &str,
    components: &[DestinyComponentType],
) -> Result<DestinyProfileResponse, ServiceError> {
    let path = format!("/Platform/Destiny2/{}/Profile/{}/", membership_type, membership_id);
    client
        .get(&path, &[("components", DestinyComponentType::join(components))])
        .await
}

/// The membership to act as.
///
/// Cross-save overridden memberships are skipped. With several left, the
/// one played most recently wins; profiles that fail to load are ignored
/// and the first membership is the fallback.
pub async fn get_membership_data(client: &ApiClient) -> Result<Option<UserInfoCard>, ServiceError> {
    let data = get_membership_data_for_current_user(client).await?;
    Ok(choose_membership(client, data.destiny_memberships).await)
}

/// Pick the membership to act as from an already fetched list.
pub async fn choose_membership(
    client: &ApiClient,
    memberships: Vec<UserInfoCard>,
) -> Option<UserInfoCard> {
    let memberships: Vec<UserInfoCard> = memberships
        .into_iter()
        .filter(|m| {
            m.cross_save_override == BungieMembershipType::NONE
                || m.cross_save_override == m.membership_type
        })
        .collect();

    if memberships.len() <= 1 {
        return memberships.into_iter().next();
    }

    let lookups = memberships.iter().map(|m| {
        get_profile_raw(
            client,
            m.membership_type,
            &m.membership_id,
            &[DestinyComponentType::Profiles],
        )
    });
    let profiles = join_all(lookups).await;

    let mut best = 0;
    let mut last_played = None;
    for (index, (membership, profile)) in memberships.iter().zip(profiles).enumerate() {
        let profile = match profile {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    membership_id = %membership.membership_id,
                    "Failed to load profile; it may be linked without characters: {}",
                    e
                );
                continue;
            }
        };
        if let Some(played) = profile.date_last_played() {
            if last_played.map_or(true, |prev| played > prev) {
                last_played = Some(played);
                best = index;
            }
        }
    }

    memberships.into_iter().nth(best)
}

/// Every profile linked to a Bungie.net account.
pub async fn get_linked_profiles(
    client: &ApiClient,
    bungie_membership_id: &str,
) -> Result<DestinyLinkedProfilesResponse, ServiceError> {
    let path = format!(
        "/Platform/Destiny2/{}/Profile/{}/LinkedProfiles/",
        BungieMembershipType::BUNGIE_NEXT,
        bungie_membership_id
    );
    client
        .get(&path, &[("getAllMemberships", "true".to_string())])
        .await
}

/// Destiny accounts of a Bungie.net account, including ones that errored.
pub async fn get_destiny_accounts(
    client: &ApiClient,
    bungie_membership_id: &str,
) -> Result<Vec<DestinyAccount>, ServiceError> {
    let linked = get_linked_profiles(client, bungie_membership_id).await?;
    let accounts = accounts_from_linked_profiles(&linked);
    if accounts.is_empty() {
        tracing::warn!(bungie_membership_id, "No Destiny platforms linked to account");
    }
    Ok(accounts)
}

/// Build account snapshots. Profiles with errors may be Destiny 1
/// accounts; they are kept with their own platform only.
pub fn accounts_from_linked_profiles(linked: &DestinyLinkedProfilesResponse) -> Vec<DestinyAccount> {
    let now = Utc::now();

    let healthy = linked.profiles.iter().map(|profile| DestinyAccount {
        display_name: format_bungie_name(profile),
        original_platform_type: profile.membership_type,
        platform_label: profile.membership_type.label(),
        membership_id: profile.membership_id.clone(),
        platforms: profile.applicable_membership_types.clone(),
        last_played: profile.date_last_played,
        versions_owned: None,
    });

    let errored = linked.profiles_with_errors.iter().map(|errored| {
        let card = &errored.info_card;
        DestinyAccount {
            display_name: format_bungie_name(card),
            original_platform_type: card.membership_type,
            platform_label: card.membership_type.label(),
            membership_id: card.membership_id.clone(),
            platforms: vec![card.membership_type],
            last_played: Some(now),
            versions_owned: None,
        }
    });

    healthy.chain(errored).collect()
}

/// Profile of `account`. An empty response means no account on that platform.
pub async fn get_profile(
    client: &ApiClient,
    account: &DestinyAccount,
    components: &[DestinyComponentType],
) -> Result<DestinyProfileResponse, ServiceError> {
    let profile = get_profile_raw(
        client,
        account.original_platform_type,
        &account.membership_id,
        components,
    )
    .await?;

    if profile.is_empty() {
        return Err(ServiceError {
            category: ErrorCategory::NoAccountForPlatform,
            source: ApiError::Internal(format!(
                "no Destiny profile for {} on {}",
                account.membership_id, account.platform_label
            )),
        });
    }
    Ok(profile)
}

/// Characters only; enough to refresh stats.
pub async fn get_characters(
    client: &ApiClient,
    account: &DestinyAccount,
) -> Result<DestinyProfileResponse, ServiceError> {
    get_profile(client, account, &[DestinyComponentType::Characters]).await
}

/// Characters, vault and item details.
pub async fn get_stores(
    client: &ApiClient,
    account: &DestinyAccount,
) -> Result<DestinyProfileResponse, ServiceError> {
    get_profile(client, account, STORES_COMPONENTS).await
}

/// Every character's inventory, or `None` if anything went wrong.
pub async fn get_character_inventory_items(
    client: &ApiClient,
    account: &DestinyAccount,
) -> Option<Vec<DestinyItemComponent>> {
    match get_stores(client, account).await {
        Ok(profile) => profile.character_inventory_items(),
        Err(e) => {
            tracing::debug!("Could not load character inventories: {}", e);
            None
        }
    }
}
