mod common;

use common::*;
use leave_management::error::LeaveError;
use leave_management::service::RequestQuery;
use leave_management::workflow::{LeaveStatus, Level};

fn is_unauthorized<T: std::fmt::Debug>(result: &Result<T, LeaveError>) -> bool {
    matches!(result, Err(LeaveError::Unauthorized(_)))
}

#[actix_web::test]
async fn owner_cannot_review_their_own_request() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;

    let result = fx.service.approve(request.id, ALICE, None, None).await;
    assert!(is_unauthorized(&result), "{result:?}");

    // an admin's own request needs another admin
    let own = fx.submit_three_days(ADMIN).await;
    let result = fx.service.approve(own.id, ADMIN, None, None).await;
    assert!(is_unauthorized(&result), "{result:?}");

    let state = fx.store.snapshot().await;
    assert_eq!(state.requests[&request.id].status, LeaveStatus::Pending);
    assert_eq!(state.requests[&own.id].status, LeaveStatus::Pending);
}

#[actix_web::test]
async fn only_the_owners_manager_reviews_at_manager_level() {
    let fx = fixture();
    let alice = fx.submit_three_days(ALICE).await;
    let carol = fx.submit_three_days(CAROL).await;

    // colleague
    let result = fx.service.approve(alice.id, BOB, None, None).await;
    assert!(is_unauthorized(&result), "{result:?}");

    // a manager, but not Carol's
    let result = fx
        .service
        .reject(carol.id, MANAGER, Some(Level::Manager), None)
        .await;
    assert!(is_unauthorized(&result), "{result:?}");

    assert_eq!(figures(&fx.balance(CAROL, ANNUAL).await), (12, 0, 3, 9));
}

#[actix_web::test]
async fn manager_cannot_give_final_approval() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;
    fx.service
        .approve(request.id, MANAGER, None, None)
        .await
        .unwrap();

    let result = fx.service.approve(request.id, MANAGER, None, None).await;

    assert!(is_unauthorized(&result), "{result:?}");
    assert_eq!(figures(&fx.balance(ALICE, ANNUAL).await), (12, 0, 3, 9));
}

#[actix_web::test]
async fn only_the_owner_can_cancel() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;

    for actor in [MANAGER, ADMIN, BOB] {
        let result = fx.service.cancel(request.id, actor).await;
        assert!(is_unauthorized(&result), "actor {actor}: {result:?}");
    }
    assert_eq!(figures(&fx.balance(ALICE, ANNUAL).await), (12, 0, 3, 9));
}

#[actix_web::test]
async fn actors_from_another_tenant_are_refused() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;

    let result = fx.service.approve(request.id, OUTSIDER_ADMIN, None, None).await;
    assert!(is_unauthorized(&result), "{result:?}");

    let result = fx.service.get_request(OUTSIDER_ADMIN, request.id).await;
    assert!(matches!(result, Err(LeaveError::NotFound(_))), "{result:?}");

    let result = fx.service.balances(OUTSIDER_ADMIN, ALICE, YEAR).await;
    assert!(matches!(result, Err(LeaveError::NotFound(_))), "{result:?}");
}

#[actix_web::test]
async fn inactive_or_unknown_users_cannot_act() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;
    fx.store
        .update(|state| {
            if let Some(manager) = state.users.get_mut(&MANAGER) {
                manager.is_active = false;
            }
        })
        .await;

    let result = fx.service.approve(request.id, MANAGER, None, None).await;
    assert!(is_unauthorized(&result), "{result:?}");

    let result = fx
        .service
        .submit(MANAGER, annual(date(4, 6), date(4, 8)))
        .await;
    assert!(is_unauthorized(&result), "{result:?}");

    let result = fx.service.dashboard(4_242, None).await;
    assert!(is_unauthorized(&result), "{result:?}");
}

#[actix_web::test]
async fn request_and_balance_visibility_follows_the_reporting_line() {
    let fx = fixture();
    let request = fx.submit_three_days(ALICE).await;

    for viewer in [ALICE, MANAGER, ADMIN] {
        assert_eq!(
            fx.service.get_request(viewer, request.id).await.unwrap().id,
            request.id
        );
        assert_eq!(
            fx.service.balances(viewer, ALICE, YEAR).await.unwrap().len(),
            3
        );
    }

    let result = fx.service.get_request(BOB, request.id).await;
    assert!(is_unauthorized(&result), "{result:?}");
    let result = fx.service.balances(BOB, ALICE, YEAR).await;
    assert!(is_unauthorized(&result), "{result:?}");

    let result = fx
        .service
        .list_requests(
            BOB,
            RequestQuery {
                employee_id: Some(ALICE),
                ..RequestQuery::default()
            },
        )
        .await;
    assert!(is_unauthorized(&result), "{result:?}");
}

#[actix_web::test]
async fn provisioning_is_admin_only() {
    let fx = fixture();

    let result = fx.service.provision_year(MANAGER, ALICE, 2027).await;
    assert!(is_unauthorized(&result), "{result:?}");

    let result = fx.service.provision_tenant_year(ALICE, 2027).await;
    assert!(is_unauthorized(&result), "{result:?}");

    // admins only provision inside their own tenant
    let result = fx.service.provision_year(OUTSIDER_ADMIN, ALICE, 2027).await;
    assert!(matches!(result, Err(LeaveError::NotFound("user"))), "{result:?}");

    assert!(fx.store.balance(key_for(ALICE, ANNUAL, 2027)).await.is_none());
}
