//! Account profile probe

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_bool, expect_int, expect_object, expect_string, get, is_present};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

pub async fn profile(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/user");
    let Some(response) = exchange(client, writer, "user_get", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "user", &mut errors) {
        expect_int(body.get("status"), "status", &mut errors);
        let user = body.get("user");
        expect_object(user, "user", &mut errors);

        let subscription = get(user, "subscription");
        if is_present(subscription) {
            expect_object(subscription, "user.subscription", &mut errors);
            let active = get(subscription, "active");
            if active.is_some() {
                expect_bool(active, "user.subscription.active", &mut errors);
            }
        }
        let profile = get(user, "profile");
        if is_present(profile) {
            expect_object(profile, "user.profile", &mut errors);
        }
        if user.is_some_and(|u| u.is_object()) {
            expect_string(get(user, "username"), "user.username", &mut errors);
        }
    }

    TestOutcome::from_errors(errors)
}
