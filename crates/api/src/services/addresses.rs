//! Address book service.
//!
//! Ownership checks live here; the single-default invariant itself is
//! enforced transactionally by the address store.

use std::sync::Arc;

use maplemart_core::{AddressId, UserId};
use thiserror::Error;

use crate::models::{Address, NewAddress};
use crate::store::{AddressBook, StoreError};

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The address id does not resolve.
    #[error("address not found")]
    NotFound,

    /// The address belongs to a different user.
    #[error("not authorized to access this address")]
    Forbidden,

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service for a user's saved addresses.
pub struct AddressService {
    addresses: Arc<dyn AddressBook>,
}

impl AddressService {
    /// Create the service over its collaborator.
    #[must_use]
    pub fn new(addresses: Arc<dyn AddressBook>) -> Self {
        Self { addresses }
    }

    /// The user's addresses, default first, then most recently created.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(&self, user: UserId) -> Result<Vec<Address>, AddressError> {
        Ok(self.addresses.list(user).await?)
    }

    /// Save a new address; a default demotes the user's other addresses in
    /// the same transaction.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn create(&self, user: UserId, address: NewAddress) -> Result<Address, AddressError> {
        Ok(self.addresses.create(user, address).await?)
    }

    /// Replace an owned address's fields.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve; `Forbidden` if it belongs to a
    /// different user.
    pub async fn update(
        &self,
        id: AddressId,
        requester: UserId,
        address: NewAddress,
    ) -> Result<Address, AddressError> {
        self.check_owner(id, requester).await?;
        self.addresses
            .update(id, address)
            .await?
            .ok_or(AddressError::NotFound)
    }

    /// Promote an owned address to the user's default.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve; `Forbidden` if it belongs to a
    /// different user.
    pub async fn set_default(
        &self,
        id: AddressId,
        requester: UserId,
    ) -> Result<Address, AddressError> {
        self.check_owner(id, requester).await?;
        self.addresses
            .set_default(id)
            .await?
            .ok_or(AddressError::NotFound)
    }

    /// Delete an owned address.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve; `Forbidden` if it belongs to a
    /// different user.
    pub async fn delete(&self, id: AddressId, requester: UserId) -> Result<(), AddressError> {
        self.check_owner(id, requester).await?;
        if self.addresses.delete(id).await? {
            Ok(())
        } else {
            Err(AddressError::NotFound)
        }
    }

    async fn check_owner(&self, id: AddressId, requester: UserId) -> Result<(), AddressError> {
        let address = self
            .addresses
            .get(id)
            .await?
            .ok_or(AddressError::NotFound)?;
        if address.user_id != requester {
            return Err(AddressError::Forbidden);
        }
        Ok(())
    }
}
