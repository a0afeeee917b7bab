use bytes::Bytes;
use domains::{DomainError, Page, SportType, UserRole, VenueFilter, VenueImage, VenueStatus};
use integration_tests::{claims, court_details, monday_morning, venue_details, Harness};
use services::media::Upload;
use services::user::SignUp;

#[tokio::test]
async fn pending_venue_is_listed_publicly_once_approved() {
    let h = Harness::new(monday_morning());
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let admin = h.seed_admin("admin").await;
    let venues = &h.services.venues;

    let venue = venues.create(&owner, venue_details("Baseline Club", vec![SportType::Tennis])).await.unwrap();
    assert_eq!(venue.status, VenueStatus::Pending);
    assert_eq!(venues.list_public(VenueFilter::default(), Page::default()).await.unwrap().total, 0);
    assert!(matches!(venues.get(None, venue.id).await, Err(DomainError::NotFound(..))));
    assert_eq!(venues.get(Some(&owner), venue.id).await.unwrap().id, venue.id);

    let pending = venues.list_pending(&admin, Page::default()).await.unwrap();
    assert_eq!(pending.items.len(), 1);

    venues.approve(&admin, venue.id).await.unwrap();
    let listed = venues.list_public(VenueFilter::default(), Page::default()).await.unwrap();
    assert_eq!(listed.items.iter().map(|v| v.id).collect::<Vec<_>>(), vec![venue.id]);
    assert!(venues.get(None, venue.id).await.is_ok());
    assert_eq!(venues.list_pending(&admin, Page::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn public_listing_filters_by_sport_and_search() {
    let h = Harness::new(monday_morning());
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let admin = h.seed_admin("admin").await;
    for (name, sport) in [("Shuttle House", SportType::Badminton), ("Clay Courts", SportType::Tennis)] {
        let v = h.services.venues.create(&owner, venue_details(name, vec![sport])).await.unwrap();
        h.services.venues.approve(&admin, v.id).await.unwrap();
    }

    let tennis = VenueFilter { sport: Some(SportType::Tennis), ..VenueFilter::default() };
    let found = h.services.venues.list_public(tennis, Page::default()).await.unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].details.name, "Clay Courts");

    let search = VenueFilter { search: Some("shuttle".into()), ..VenueFilter::default() };
    assert_eq!(h.services.venues.list_public(search, Page::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn moderation_is_one_way_and_requires_a_reason_to_reject() {
    let h = Harness::new(monday_morning());
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let admin = h.seed_admin("admin").await;
    let venues = &h.services.venues;
    let venue = venues.create(&owner, venue_details("Gym", vec![SportType::Basketball])).await.unwrap();

    assert!(matches!(venues.approve(&owner, venue.id).await, Err(DomainError::Authorization(_))));
    assert!(matches!(venues.reject(&admin, venue.id, "  ").await, Err(DomainError::Validation(_))));

    let rejected = venues.reject(&admin, venue.id, "photos missing").await.unwrap();
    assert_eq!(rejected.status, VenueStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("photos missing"));

    assert!(matches!(venues.approve(&admin, venue.id).await, Err(DomainError::Conflict(_))));
    assert!(matches!(venues.get(None, venue.id).await, Err(DomainError::NotFound(..))));
}

#[tokio::test]
async fn only_pending_venues_are_editable_and_only_by_their_owner() {
    let h = Harness::new(monday_morning());
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let rival = h.sign_up("rival", UserRole::FacilityOwner).await;
    let admin = h.seed_admin("admin").await;
    let venues = &h.services.venues;
    let venue = venues.create(&owner, venue_details("Arena", vec![SportType::Squash])).await.unwrap();

    let renamed = venues.update(&owner, venue.id, venue_details("Arena Two", vec![SportType::Squash])).await.unwrap();
    assert_eq!(renamed.details.name, "Arena Two");
    assert!(matches!(
        venues.update(&rival, venue.id, venue_details("Mine", vec![SportType::Squash])).await,
        Err(DomainError::Authorization(_))
    ));

    venues.approve(&admin, venue.id).await.unwrap();
    assert!(matches!(
        venues.update(&owner, venue.id, venue_details("Arena Three", vec![SportType::Squash])).await,
        Err(DomainError::Conflict(_))
    ));

    // Deactivation hides the venue but keeps it for its owner.
    venues.set_active(&owner, venue.id, false).await.unwrap();
    assert!(matches!(venues.get(None, venue.id).await, Err(DomainError::NotFound(..))));
    assert!(!venues.get(Some(&owner), venue.id).await.unwrap().is_active);
    assert_eq!(venues.list_mine(&owner, None, Page::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn players_cannot_register_venues_and_courts_must_match_venue_sports() {
    let h = Harness::new(monday_morning());
    let player = h.sign_up("player", UserRole::User).await;
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let admin = h.seed_admin("admin").await;

    let denied = h.services.venues.create(&player, venue_details("Nope", vec![SportType::Tennis])).await;
    assert!(matches!(denied, Err(DomainError::Authorization(_))));

    let venue = h.approved_venue(&owner, &admin, "Mixed").await;
    let wrong_sport = h.services.courts.add(&owner, venue.id, court_details("Pitch", SportType::Football, 900)).await;
    assert!(matches!(wrong_sport, Err(DomainError::Validation(_))));
    let free = h.services.courts.add(&owner, venue.id, court_details("Court 1", SportType::Tennis, 0)).await;
    assert!(matches!(free, Err(DomainError::Validation(_))));

    let court = h.services.courts.add(&owner, venue.id, court_details("Court 1", SportType::Tennis, 1200)).await.unwrap();
    h.services.courts.set_active(&owner, court.id, false).await.unwrap();
    assert!(h.services.courts.list(None, venue.id).await.unwrap().is_empty());
    assert_eq!(h.services.courts.list(Some(&owner), venue.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sign_up_is_idempotent_and_admin_is_never_self_assigned() {
    let h = Harness::new(monday_morning());
    let users = &h.services.users;
    let who = claims("pat");

    let (created, fresh) = users
        .sync(&who, SignUp { role: Some(UserRole::FacilityOwner), display_name: Some("Pat".into()) })
        .await
        .unwrap();
    assert!(fresh);
    assert_eq!(created.role, UserRole::FacilityOwner);
    assert_eq!(created.role.home_path(), "/owner/dashboard");

    // The requested role only applies on creation.
    let (again, fresh) = users.sync(&who, SignUp { role: Some(UserRole::User), display_name: None }).await.unwrap();
    assert!(!fresh);
    assert_eq!(again.id, created.id);
    assert_eq!(again.role, UserRole::FacilityOwner);

    let grab = users.sync(&claims("eve"), SignUp { role: Some(UserRole::Admin), display_name: None }).await;
    assert!(matches!(grab, Err(DomainError::Authorization(_))));
    assert!(matches!(users.resolve(&claims("eve")).await, Err(DomainError::Authentication(_))));
}

#[tokio::test]
async fn admins_moderate_users_but_not_themselves() {
    let h = Harness::new(monday_morning());
    let admin = h.seed_admin("admin").await;
    let player = h.sign_up("player", UserRole::User).await;
    let users = &h.services.users;

    assert!(matches!(users.change_role(&admin, admin.user_id, UserRole::User).await, Err(DomainError::Conflict(_))));
    assert!(matches!(users.set_active(&admin, admin.user_id, false).await, Err(DomainError::Conflict(_))));
    assert!(matches!(users.list(&player, &Default::default(), Page::default()).await, Err(DomainError::Authorization(_))));

    let promoted = users.change_role(&admin, player.user_id, UserRole::FacilityOwner).await.unwrap();
    assert_eq!(promoted.role, UserRole::FacilityOwner);

    users.set_active(&admin, player.user_id, false).await.unwrap();
    assert!(matches!(users.resolve(&claims("player")).await, Err(DomainError::Authorization(_))));

    let owners = domains::UserFilter { role: Some(UserRole::FacilityOwner), ..Default::default() };
    assert_eq!(users.list(&admin, &owners, Page::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn images_are_removed_only_by_their_uploader_once_no_venue_lists_them() {
    let h = Harness::new(monday_morning());
    let owner = h.sign_up("owner", UserRole::FacilityOwner).await;
    let rival = h.sign_up("rival", UserRole::FacilityOwner).await;
    let media = &h.services.media;

    let photo = Upload { content_type: "image/png".into(), data: Bytes::from_static(b"centre court at dusk") };
    let image = media.upload(&owner, photo).await.unwrap();
    assert!(matches!(media.delete(&rival, &image.id).await, Err(DomainError::Authorization(_))));
    assert!(h.media.get(&image.id).is_some());

    let mut details = venue_details("Dusk Courts", vec![SportType::Tennis]);
    details.images = vec![VenueImage { id: image.id.clone(), url: image.url.clone() }];
    let venue = h.services.venues.create(&owner, details).await.unwrap();
    assert!(matches!(media.delete(&owner, &image.id).await, Err(DomainError::Conflict(_))));

    h.services.venues.update(&owner, venue.id, venue_details("Dusk Courts", vec![SportType::Tennis])).await.unwrap();
    media.delete(&owner, &image.id).await.unwrap();
    assert!(h.media.get(&image.id).is_none());
    assert!(matches!(media.delete(&owner, &image.id).await, Err(DomainError::NotFound(..))));
}
