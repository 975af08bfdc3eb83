use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{AddressEntity, CreateAddressEntity},
    store::{Store, StoreError, finish},
};

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: String,
    #[serde(default)]
    pub building_name: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

impl AddressInput {
    fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("country", &self.country),
            ("postalCode", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} must not be blank")));
            }
        }
        Ok(())
    }
}

pub async fn create_address(
    store: &dyn Store,
    email: &str,
    input: AddressInput,
) -> Result<AddressEntity, AppError> {
    input.validate()?;

    let mut tx = store.begin().await?;
    let result = tx
        .insert_address(CreateAddressEntity {
            email: email.to_string(),
            street: input.street.trim().to_string(),
            building_name: input.building_name.trim().to_string(),
            city: input.city.trim().to_string(),
            state: input.state.trim().to_string(),
            country: input.country.trim().to_string(),
            postal_code: input.postal_code.trim().to_string(),
        })
        .await
        .map_err(AppError::from);
    finish(tx, result).await
}

pub async fn my_addresses(store: &dyn Store, email: &str) -> Result<Vec<AddressEntity>, AppError> {
    let mut tx = store.begin().await?;
    let result = tx.addresses_by_email(email).await.map_err(AppError::from);
    finish(tx, result).await
}

/// Another customer's address is reported as missing.
pub async fn get_address(
    store: &dyn Store,
    email: &str,
    address_id: i32,
) -> Result<AddressEntity, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        tx.find_address(address_id)
            .await?
            .filter(|address| address.email == email)
            .ok_or_else(|| AppError::not_found("Address", "addressId", address_id))
    }
    .await;
    finish(tx, result).await
}

pub async fn delete_address(
    store: &dyn Store,
    email: &str,
    address_id: i32,
) -> Result<AddressEntity, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        tx.find_address(address_id)
            .await?
            .filter(|address| address.email == email)
            .ok_or_else(|| AppError::not_found("Address", "addressId", address_id))?;

        match tx.delete_address(address_id).await {
            Ok(Some(address)) => Ok(address),
            Ok(None) => Err(AppError::not_found("Address", "addressId", address_id)),
            Err(StoreError::Conflict(_)) => Err(AppError::BusinessRule(
                "Address is used by an existing order".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
    .await;
    finish(tx, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn home() -> AddressInput {
        AddressInput {
            street: "4 Lake Drive".to_string(),
            building_name: String::new(),
            city: "Kandy".to_string(),
            state: "Central".to_string(),
            country: "Sri Lanka".to_string(),
            postal_code: "20000".to_string(),
        }
    }

    #[tokio::test]
    async fn addresses_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let mine = create_address(&store, "jane@pharma.test", home()).await.unwrap();
        create_address(&store, "omar@pharma.test", home()).await.unwrap();

        assert_eq!(my_addresses(&store, "jane@pharma.test").await.unwrap().len(), 1);
        assert_eq!(
            get_address(&store, "jane@pharma.test", mine.id).await.unwrap(),
            mine
        );
        assert!(matches!(
            get_address(&store, "omar@pharma.test", mine.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_address(&store, "omar@pharma.test", mine.id).await,
            Err(AppError::NotFound(_))
        ));

        delete_address(&store, "jane@pharma.test", mine.id).await.unwrap();
        assert!(my_addresses(&store, "jane@pharma.test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let store = MemoryStore::new();
        let input = AddressInput {
            city: " ".to_string(),
            ..home()
        };
        assert!(matches!(
            create_address(&store, "jane@pharma.test", input).await,
            Err(AppError::Validation(msg)) if msg.contains("city")
        ));
    }
}
