mod helpers;

use chrono::Duration;
use uuid::Uuid;

use helpers::{service_date, World, PROPERTY_LAT, PROPERTY_LNG};
use valet_dispatch::models::instance::InstanceStatus;
use valet_dispatch::models::property::Unit;
use valet_dispatch::models::verification::UnitVerificationStatus;
use valet_dispatch::models::view::ListJobsQuery;
use valet_dispatch::models::worker::{AccountStatus, Worker};
use valet_dispatch::services::completion::UnitPhoto;
use valet_dispatch::services::geo::Coordinates;

fn query_at(lat: f64, lng: f64) -> ListJobsQuery {
    ListJobsQuery {
        lat: Some(lat),
        lng: Some(lng),
        page: 1,
        size: 50,
    }
}

fn here() -> ListJobsQuery {
    query_at(PROPERTY_LAT, PROPERTY_LNG)
}

async fn visible_ids(world: &World, worker_id: Uuid) -> Vec<Uuid> {
    world
        .service
        .list_open_jobs(worker_id, &here())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|v| v.instance_id)
        .collect()
}

#[tokio::test]
async fn test_open_jobs_render_the_job() {
    let world = World::new().await;
    let inst = world.open_instance();

    let page = world
        .service
        .list_open_jobs(world.worker_id, &here())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    let view = &page.items[0];
    assert_eq!(view.instance_id, inst.id);
    assert_eq!(view.status, InstanceStatus::Open);
    assert_eq!(view.pay, 40.0);
    assert_eq!(view.estimated_time_minutes, Some(60));
    assert_eq!(view.window_start, "18:00");
    assert_eq!(view.window_end, "20:40");
    assert_eq!(view.start_hint, "19:30");
    assert_eq!(view.property.name, "Lakeview Commons");
    assert_eq!(view.buildings.len(), 1);
    assert_eq!(view.buildings[0].name, "North Tower");
    assert_eq!(view.buildings[0].units.len(), 2);
    assert!(view.buildings[0]
        .units
        .iter()
        .all(|u| u.status == UnitVerificationStatus::Pending));
    assert_eq!(view.dumpsters.len(), 1);
    assert!(view.distance_miles.unwrap() < 0.1);
}

#[tokio::test]
async fn test_open_jobs_hide_what_cannot_be_taken() {
    let world = World::new().await;
    let visible = world.open_instance();
    let mut excluded = world.open_instance_on(service_date() + Duration::days(1));
    excluded.exclude(world.worker_id);
    world.store.put_instance(excluded.clone());
    let taken = world.open_instance_on(service_date() + Duration::days(2));
    let rival = world.add_worker(100);
    world
        .service
        .accept_job(rival, taken.id, &world.on_site())
        .await
        .unwrap();

    assert_eq!(visible_ids(&world, world.worker_id).await, vec![visible.id]);

    world.set_local(20, 25);
    assert!(visible_ids(&world, world.worker_id).await.is_empty());
}

#[tokio::test]
async fn test_open_jobs_respect_the_radius() {
    let world = World::new().await;
    world.open_instance();

    // Milwaukee is about 80 miles away
    let far = world
        .service
        .list_open_jobs(world.worker_id, &query_at(43.0389, -87.9065))
        .await
        .unwrap();
    assert_eq!(far.total, 0);

    // Without a position every property is considered
    let anywhere = ListJobsQuery {
        lat: None,
        lng: None,
        page: 1,
        size: 50,
    };
    let page = world
        .service
        .list_open_jobs(world.worker_id, &anywhere)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].distance_miles, None);
}

#[tokio::test]
async fn test_release_is_staggered_by_score() {
    let world = World::new().await;
    let edge = world.open_instance_on(service_date() + Duration::days(6));
    let beyond = world.open_instance_on(service_date() + Duration::days(7));
    let trusted = world.worker_id;
    let middling = world.add_worker(50);
    let new_worker = world.add_worker(0);

    // 00:30 local: the edge day opened at midnight for perfect scores only
    world.set_local(0, 30);
    assert_eq!(visible_ids(&world, trusted).await, vec![edge.id]);
    assert!(visible_ids(&world, middling).await.is_empty());
    assert!(visible_ids(&world, new_worker).await.is_empty());

    world.set_local(1, 0);
    assert_eq!(visible_ids(&world, middling).await, vec![edge.id]);
    assert!(visible_ids(&world, new_worker).await.is_empty());

    world.set_local(2, 0);
    assert_eq!(visible_ids(&world, new_worker).await, vec![edge.id]);

    // A week out stays hidden until tomorrow
    world.set_local(23, 0);
    assert!(!visible_ids(&world, trusted).await.contains(&beyond.id));
}

#[tokio::test]
async fn test_tenants_see_their_property_early() {
    let world = World::new().await;
    let edge = world.open_instance_on(service_date() + Duration::days(6));

    let token = "tenant-7f3a".to_string();
    world.store.put_unit(Unit {
        id: Uuid::new_v4(),
        property_id: world.property.id,
        building_id: world.building.id,
        unit_number: "305".to_string(),
        floor: Some(3),
        tenant_token: Some(token.clone()),
    });
    let tenant = Worker {
        id: Uuid::new_v4(),
        account_status: AccountStatus::Active,
        reliability_score: 0,
        tenant_token: Some(token),
    };
    world.store.put_worker(tenant.clone());
    let stranger = world.add_worker(0);

    world.set_local(1, 0);
    assert_eq!(visible_ids(&world, tenant.id).await, vec![edge.id]);
    assert!(visible_ids(&world, stranger).await.is_empty());
}

#[tokio::test]
async fn test_open_jobs_paginate() {
    let world = World::new().await;
    for offset in 0..3 {
        world.open_instance_on(service_date() + Duration::days(offset));
    }

    let mut query = here();
    query.size = 2;
    query.page = 2;
    let page = world
        .service
        .list_open_jobs(world.worker_id, &query)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.size, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].service_date, service_date() + Duration::days(2));
}

#[tokio::test]
async fn test_my_jobs_show_progress() {
    let world = World::new().await;
    let inst = world.in_progress_instance().await;
    let other = world.open_instance_on(service_date() + Duration::days(1));

    world
        .service
        .verify_unit_photo(
            world.worker_id,
            inst.id,
            &world.on_site(),
            UnitPhoto {
                unit_id: world.units[0].id,
                image: &[0xFF, 0xD8, 0xFF],
                missing_trash_can: false,
            },
        )
        .await
        .unwrap();

    let mine = world
        .service
        .list_my_jobs(world.worker_id, Some(Coordinates::new(PROPERTY_LAT, PROPERTY_LNG)))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].instance_id, inst.id);
    assert_ne!(mine[0].instance_id, other.id);
    assert_eq!(mine[0].status, InstanceStatus::InProgress);
    assert_eq!(mine[0].check_in_at, inst.check_in_at);

    let units = &mine[0].buildings[0].units;
    let first = units.iter().find(|u| u.unit_id == world.units[0].id).unwrap();
    assert_eq!(first.status, UnitVerificationStatus::Verified);
    let second = units.iter().find(|u| u.unit_id == world.units[1].id).unwrap();
    assert_eq!(second.status, UnitVerificationStatus::Pending);

    let stranger = world.add_worker(100);
    assert!(world
        .service
        .list_my_jobs(stranger, None)
        .await
        .unwrap()
        .is_empty());
}
