//! Bindings for the ESI endpoints this crate reads.
//!
//! Each binding names a method, a path template and its placeholders; the
//! rest is [`EsiClient::fetch`]. Paginated endpoints honor
//! [`FetchOptions::all`].

use serde_json::Value;

use super::{EsiClient, EsiRequest, EsiResponse, FetchOptions};
use crate::error::{EsiError, Result};
use crate::types::PublicCharacter;

impl EsiClient {
    pub async fn character_contracts(
        &self,
        character_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v1/characters/{character_id}/contracts/")
            .param("character_id", character_id)
            .paginated();
        self.fetch(request, options).await
    }

    /// Items of one contract. Pass
    /// [`tolerating_unauthorized`](FetchOptions::tolerating_unauthorized) to get a
    /// 401 back as an in-band error.
    pub async fn character_contract_items(
        &self,
        character_id: i64,
        contract_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request =
            EsiRequest::get("/v1/characters/{character_id}/contracts/{contract_id}/items/")
                .param("character_id", character_id)
                .param("contract_id", contract_id)
                .paginated();
        self.fetch(request, options).await
    }

    pub async fn corporation_contracts(
        &self,
        corporation_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v1/corporations/{corporation_id}/contracts/")
            .param("corporation_id", corporation_id)
            .paginated();
        self.fetch(request, options).await
    }

    pub async fn corporation_contract_items(
        &self,
        corporation_id: i64,
        contract_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request =
            EsiRequest::get("/v1/corporations/{corporation_id}/contracts/{contract_id}/items/")
                .param("corporation_id", corporation_id)
                .param("contract_id", contract_id)
                .paginated();
        self.fetch(request, options).await
    }

    pub async fn character_wallet_transactions(
        &self,
        character_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v1/characters/{character_id}/wallet/transactions/")
            .param("character_id", character_id)
            .paginated();
        self.fetch(request, options).await
    }

    pub async fn character_wallet_journal(
        &self,
        character_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v6/characters/{character_id}/wallet/journal/")
            .param("character_id", character_id)
            .paginated();
        self.fetch(request, options).await
    }

    /// Single page.
    pub async fn structure(&self, structure_id: i64, options: &FetchOptions) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v2/universe/structures/{structure_id}/")
            .param("structure_id", structure_id);
        self.fetch(request, options).await
    }

    /// Bulk id→name resolution. Public, single page; decode as
    /// [`ResolvedName`](crate::types::ResolvedName).
    pub async fn resolve_names(&self, ids: &[i64], options: &FetchOptions) -> Result<EsiResponse> {
        let body = Value::Array(ids.iter().map(|id| Value::from(*id)).collect());
        let request = EsiRequest::post("/v3/universe/names/", body).public();
        self.fetch(request, options).await
    }

    /// Public character profile. Single page.
    pub async fn character_public(
        &self,
        character_id: i64,
        options: &FetchOptions,
    ) -> Result<EsiResponse> {
        let request = EsiRequest::get("/v5/characters/{character_id}/")
            .param("character_id", character_id)
            .public();
        self.fetch(request, options).await
    }

    /// [`character_public`](Self::character_public), decoded. A 403 is
    /// [`EsiError::Rejected`]; an empty body is a decode error.
    pub async fn public_character(&self, character_id: i64) -> Result<PublicCharacter> {
        let response = self
            .character_public(character_id, &FetchOptions::default())
            .await?
            .error_for_outcome()?;
        response
            .decode_single()?
            .ok_or_else(|| EsiError::ResponseDecode {
                path: response.path().to_string(),
                body: String::new(),
                message: "empty payload".to_string(),
            })
    }
}
