//! Address book: the at-most-one-default invariant, ownership checks, and
//! list ordering.

use maplemart_api::models::{Address, NewAddress};
use maplemart_api::services::addresses::{AddressError, AddressService};
use maplemart_api::store::Stores;
use maplemart_core::{AddressId, UserId};
use maplemart_integration_tests::stores;
use std::sync::Arc;

fn address_service(stores: &Stores) -> AddressService {
    AddressService::new(Arc::clone(&stores.addresses))
}

fn new_address(label: &str, is_default: bool) -> NewAddress {
    NewAddress {
        first_name: label.to_owned(),
        last_name: "Rao".to_owned(),
        street: format!("{label} street"),
        city: "Pune".to_owned(),
        state: "MH".to_owned(),
        zip_code: "411001".to_owned(),
        country: "India".to_owned(),
        phone: "9876543210".to_owned(),
        is_default,
    }
}

fn default_count(addresses: &[Address]) -> usize {
    addresses.iter().filter(|a| a.is_default).count()
}

#[tokio::test]
async fn creating_a_new_default_demotes_the_previous_one() {
    let stores = stores();
    let service = address_service(&stores);
    let user = UserId::new(1);

    let first = service.create(user, new_address("Home", true)).await.unwrap();
    assert!(first.is_default);

    let second = service.create(user, new_address("Work", true)).await.unwrap();
    assert!(second.is_default);

    let listed = service.list(user).await.unwrap();
    assert_eq!(default_count(&listed), 1);
    assert_eq!(listed[0].id, second.id);
}

#[tokio::test]
async fn set_default_leaves_exactly_one_default() {
    let stores = stores();
    let service = address_service(&stores);
    let user = UserId::new(1);

    let x = service.create(user, new_address("X", false)).await.unwrap();
    let y = service.create(user, new_address("Y", true)).await.unwrap();

    let promoted = service.set_default(x.id, user).await.unwrap();
    assert!(promoted.is_default);

    let listed = service.list(user).await.unwrap();
    assert_eq!(default_count(&listed), 1);
    let x_after = listed.iter().find(|a| a.id == x.id).unwrap();
    let y_after = listed.iter().find(|a| a.id == y.id).unwrap();
    assert!(x_after.is_default);
    assert!(!y_after.is_default);
}

#[tokio::test]
async fn update_with_default_flag_demotes_others() {
    let stores = stores();
    let service = address_service(&stores);
    let user = UserId::new(1);

    let home = service.create(user, new_address("Home", true)).await.unwrap();
    let work = service.create(user, new_address("Work", false)).await.unwrap();

    service
        .update(work.id, user, new_address("Work", true))
        .await
        .unwrap();

    let listed = service.list(user).await.unwrap();
    assert_eq!(default_count(&listed), 1);
    assert!(!listed.iter().find(|a| a.id == home.id).unwrap().is_default);
}

#[tokio::test]
async fn defaults_are_scoped_per_user() {
    let stores = stores();
    let service = address_service(&stores);
    let alice = UserId::new(1);
    let bob = UserId::new(2);

    service.create(alice, new_address("A", true)).await.unwrap();
    service.create(bob, new_address("B", true)).await.unwrap();

    // Each user keeps their own default.
    assert_eq!(default_count(&service.list(alice).await.unwrap()), 1);
    assert_eq!(default_count(&service.list(bob).await.unwrap()), 1);
}

#[tokio::test]
async fn mutations_require_ownership() {
    let stores = stores();
    let service = address_service(&stores);
    let owner = UserId::new(1);
    let stranger = UserId::new(2);

    let address = service.create(owner, new_address("Home", false)).await.unwrap();

    let err = service
        .update(address.id, stranger, new_address("Hijack", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AddressError::Forbidden));

    let err = service.delete(address.id, stranger).await.unwrap_err();
    assert!(matches!(err, AddressError::Forbidden));

    let err = service.set_default(address.id, stranger).await.unwrap_err();
    assert!(matches!(err, AddressError::Forbidden));

    // Unknown ids are NotFound, not Forbidden.
    let err = service
        .delete(AddressId::new(999), owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AddressError::NotFound));
}

#[tokio::test]
async fn listing_orders_default_first_then_most_recent() {
    let stores = stores();
    let service = address_service(&stores);
    let user = UserId::new(1);

    let a = service.create(user, new_address("A", false)).await.unwrap();
    let b = service.create(user, new_address("B", true)).await.unwrap();
    let c = service.create(user, new_address("C", false)).await.unwrap();

    let listed: Vec<AddressId> = service
        .list(user)
        .await
        .unwrap()
        .into_iter()
        .map(|address| address.id)
        .collect();
    // Default first, then newest to oldest.
    assert_eq!(listed, vec![b.id, c.id, a.id]);
}

#[tokio::test]
async fn delete_removes_the_address() {
    let stores = stores();
    let service = address_service(&stores);
    let user = UserId::new(1);

    let address = service.create(user, new_address("Home", false)).await.unwrap();
    service.delete(address.id, user).await.unwrap();
    assert!(service.list(user).await.unwrap().is_empty());

    let err = service.delete(address.id, user).await.unwrap_err();
    assert!(matches!(err, AddressError::NotFound));
}
