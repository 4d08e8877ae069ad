// tests/survey_tests.rs
//
// End-to-end flows for the survey lifecycle, eligibility feed, response
// submission and creator reporting.

use sqlx::sqlite::SqlitePoolOptions;
use surveyhub::{config::Config, routes, state::AppState};

async fn spawn_app() -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a user with the given demographics and returns their token.
async fn register_user(
    client: &reqwest::Client,
    address: &str,
    gender: &str,
    residence: &str,
    birthdate: &str,
) -> String {
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123",
            "name": "Test User",
            "gender": gender,
            "birthdate": birthdate,
            "residence": residence
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login_resp: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();

    login_resp["token"].as_str().unwrap().to_string()
}

async fn top_up(client: &reqwest::Client, address: &str, token: &str, amount: i64) {
    let response = client
        .post(format!("{}/api/wallet/topup", address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "amount": amount }))
        .send()
        .await
        .expect("Top up failed");
    assert_eq!(response.status().as_u16(), 200);
}

/// Creates a draft survey and returns its id.
async fn create_draft(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    body: serde_json::Value,
) -> i64 {
    let response = client
        .post(format!("{}/api/surveys", address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Create survey failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn add_question(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    survey_id: i64,
    body: serde_json::Value,
) -> i64 {
    let response = client
        .post(format!("{}/api/surveys/{}/questions", address, survey_id))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Add question failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn publish(client: &reqwest::Client, address: &str, token: &str, survey_id: i64) {
    let response = client
        .post(format!("{}/api/surveys/{}/publish", address, survey_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Publish failed");
    assert_eq!(response.status().as_u16(), 200);
}

async fn feed(client: &reqwest::Client, address: &str, token: &str) -> Vec<serde_json::Value> {
    client
        .get(format!("{}/api/surveys/feed", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Feed failed")
        .json::<Vec<serde_json::Value>>()
        .await
        .unwrap()
}

async fn balance(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("get_me failed")
        .json()
        .await
        .unwrap();
    me["point"].as_i64().unwrap()
}

/// Fetches the survey detail and maps each question to (id, type, option ids/labels).
async fn survey_questions(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    survey_id: i64,
) -> Vec<serde_json::Value> {
    let detail: serde_json::Value = client
        .get(format!("{}/api/surveys/{}", address, survey_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Detail failed")
        .json()
        .await
        .unwrap();
    detail["questions"].as_array().unwrap().clone()
}

#[tokio::test]
async fn publish_with_insufficient_balance_leaves_draft_untouched() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1995-03-01").await;
    top_up(&client, &address, &owner, 40).await;

    // quota 10 x reward 5 = cost 50 > balance 40
    let survey_id = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({
            "title": "Campus habits",
            "target_respondents": 10,
            "reward_points": 5
        }),
    )
    .await;
    add_question(
        &client,
        &address,
        &owner,
        survey_id,
        serde_json::json!({ "content": "Why?", "question_type": "short_answer" }),
    )
    .await;

    let response = client
        .post(format!("{}/api/surveys/{}/publish", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "insufficient_balance");

    // Survey remains a draft, balance unchanged, no cost transaction written.
    assert_eq!(balance(&client, &address, &owner).await, 40);
    let mine: Vec<serde_json::Value> = client
        .get(format!("{}/api/surveys/mine", address))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine[0]["is_public"], false);

    let transactions: Vec<serde_json::Value> = client
        .get(format!("{}/api/wallet/transactions", address))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1); // only the top-up
}

#[tokio::test]
async fn survey_lifecycle_is_monotone() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1995-03-01").await;
    top_up(&client, &address, &owner, 100).await;

    let survey_id = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({
            "title": "Quick poll",
            "target_respondents": 10,
            "reward_points": 5
        }),
    )
    .await;

    // Publishing an empty survey is rejected.
    let response = client
        .post(format!("{}/api/surveys/{}/publish", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    add_question(
        &client,
        &address,
        &owner,
        survey_id,
        serde_json::json!({ "content": "Why?", "question_type": "paragraph" }),
    )
    .await;
    publish(&client, &address, &owner, survey_id).await;

    // Cost = 10 * 5 debited exactly once.
    assert_eq!(balance(&client, &address, &owner).await, 50);

    // Publishing twice is a conflict.
    let response = client
        .post(format!("{}/api/surveys/{}/publish", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Question structure is frozen after publish.
    let response = client
        .post(format!("{}/api/surveys/{}/questions", address, survey_id))
        .bearer_auth(&owner)
        .json(&serde_json::json!({ "content": "Late", "question_type": "short_answer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Close is terminal; no refund for unused quota.
    let response = client
        .post(format!("{}/api/surveys/{}/close", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(balance(&client, &address, &owner).await, 50);

    let response = client
        .post(format!("{}/api/surveys/{}/close", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn draft_validation_rejects_bad_quota_and_reward() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1995-03-01").await;

    for body in [
        serde_json::json!({ "title": "Bad", "target_respondents": 0, "reward_points": 5 }),
        serde_json::json!({ "title": "Bad", "target_respondents": 5, "reward_points": -1 }),
        serde_json::json!({ "title": "Bad", "target_respondents": 5, "reward_points": 5,
                            "age_min": 40, "age_max": 20 }),
        // quota x reward must not overflow the cost computation
        serde_json::json!({ "title": "Bad", "target_respondents": 4_611_686_018_427_387_904_i64,
                            "reward_points": 4 }),
    ] {
        let response = client
            .post(format!("{}/api/surveys", address))
            .bearer_auth(&owner)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn feed_applies_eligibility_rules() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 1000).await;

    // Restricted survey: Male / Jakarta / 17..40.
    let restricted = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({
            "title": "Restricted",
            "target_respondents": 5,
            "reward_points": 2,
            "gender": "Male",
            "residence": "Jakarta",
            "age_min": 17,
            "age_max": 40
        }),
    )
    .await;
    add_question(
        &client,
        &address,
        &owner,
        restricted,
        serde_json::json!({ "content": "Q", "question_type": "short_answer" }),
    )
    .await;
    publish(&client, &address, &owner, restricted).await;

    // A draft stays invisible regardless of who asks.
    let draft = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({ "title": "Draft", "target_respondents": 5, "reward_points": 2 }),
    )
    .await;

    // 20-year-old female from Surabaya does not match Male/Jakarta.
    let female = register_user(&client, &address, "Female", "Surabaya", "2006-01-01").await;
    assert!(feed(&client, &address, &female).await.is_empty());

    // A matching male from Jakarta sees exactly the restricted survey.
    let male = register_user(&client, &address, "Male", "Jakarta", "2000-01-01").await;
    let visible = feed(&client, &address, &male).await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["id"].as_i64().unwrap(), restricted);
    assert!(visible.iter().all(|s| s["id"].as_i64() != Some(draft)));

    // The owner never sees their own survey in the feed.
    assert!(feed(&client, &address, &owner).await.is_empty());

    // A user without a birthdate is ineligible for every age-bounded survey.
    let no_birthdate = {
        let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&serde_json::json!({
                "email": email,
                "password": "password123",
                "name": "No Birthdate",
                "gender": "Male",
                "residence": "Jakarta"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let login: serde_json::Value = client
            .post(format!("{}/api/auth/login", address))
            .json(&serde_json::json!({ "email": email, "password": "password123" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        login["token"].as_str().unwrap().to_string()
    };
    assert!(feed(&client, &address, &no_birthdate).await.is_empty());
}

#[tokio::test]
async fn expired_deadline_hides_survey_from_feed() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;

    let survey_id = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({
            "title": "Expired",
            "target_respondents": 5,
            "reward_points": 2,
            "deadline": "2020-01-01T00:00:00Z"
        }),
    )
    .await;
    add_question(
        &client,
        &address,
        &owner,
        survey_id,
        serde_json::json!({ "content": "Q", "question_type": "short_answer" }),
    )
    .await;
    publish(&client, &address, &owner, survey_id).await;

    let respondent = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;
    assert!(feed(&client, &address, &respondent).await.is_empty());

    // Submitting against the expired survey also fails before any write.
    let questions = survey_questions(&client, &address, &owner, survey_id).await;
    let qid = questions[0]["id"].as_i64().unwrap();
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&respondent)
        .json(&serde_json::json!({
            "answers": { qid.to_string(): { "type": "text", "value": "late" } }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

/// Builds a published survey with one question of each answerable shape and
/// returns (survey_id, questions).
async fn published_survey_with_mixed_questions(
    client: &reqwest::Client,
    address: &str,
    owner: &str,
    quota: i64,
    reward: i64,
) -> (i64, Vec<serde_json::Value>) {
    let survey_id = create_draft(
        client,
        address,
        owner,
        serde_json::json!({
            "title": "Campus facilities",
            "target_respondents": quota,
            "reward_points": reward
        }),
    )
    .await;

    add_question(
        client,
        address,
        owner,
        survey_id,
        serde_json::json!({ "content": "Your faculty?", "question_type": "short_answer" }),
    )
    .await;
    add_question(
        client,
        address,
        owner,
        survey_id,
        serde_json::json!({
            "content": "Best facility?",
            "question_type": "multiple_choice",
            "options": ["Gym", "Kantin", "Perpus"]
        }),
    )
    .await;
    add_question(
        client,
        address,
        owner,
        survey_id,
        serde_json::json!({
            "content": "Which do you use?",
            "question_type": "check_box",
            "options": ["Gym", "Kantin", "Perpus"]
        }),
    )
    .await;
    add_question(
        client,
        address,
        owner,
        survey_id,
        serde_json::json!({
            "content": "Rate the campus",
            "question_type": "linear_scale",
            "options": ["1", "2", "3", "4", "5"]
        }),
    )
    .await;

    publish(client, address, owner, survey_id).await;
    let questions = survey_questions(client, address, owner, survey_id).await;
    (survey_id, questions)
}

/// Answers every question of the mixed survey; checkbox picks the given labels.
fn full_answer_set(
    questions: &[serde_json::Value],
    checkbox_labels: &[&str],
) -> serde_json::Value {
    let mut answers = serde_json::Map::new();
    for q in questions {
        let qid = q["id"].as_i64().unwrap().to_string();
        let options = q["options"].as_array().cloned().unwrap_or_default();
        let answer = match q["question_type"].as_str().unwrap() {
            "short_answer" | "paragraph" => {
                serde_json::json!({ "type": "text", "value": "Engineering" })
            }
            "multiple_choice" | "drop_down" | "linear_scale" => {
                serde_json::json!({ "type": "choice", "option_id": options[0]["id"] })
            }
            "check_box" => {
                let ids: Vec<serde_json::Value> = options
                    .iter()
                    .filter(|o| checkbox_labels.contains(&o["content"].as_str().unwrap()))
                    .map(|o| o["id"].clone())
                    .collect();
                serde_json::json!({ "type": "selection", "option_ids": ids })
            }
            other => panic!("unexpected question type {}", other),
        };
        answers.insert(qid, answer);
    }
    serde_json::json!({ "answers": answers })
}

#[tokio::test]
async fn submit_rewards_respondent_and_is_idempotent() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 2, 5).await;

    let respondent = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;

    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&respondent)
        .json(&full_answer_set(&questions, &["Gym", "Kantin"]))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reward_points"], 5);
    assert_eq!(body["balance"], 5);

    // Reward shows up in the ledger and the cached balance matches the log.
    assert_eq!(balance(&client, &address, &respondent).await, 5);
    let reconciled: serde_json::Value = client
        .post(format!("{}/api/wallet/reconcile", address))
        .bearer_auth(&respondent)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reconciled["balance"], 5);

    // Second submission for the same (survey, user) is rejected and changes nothing.
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&respondent)
        .json(&full_answer_set(&questions, &["Gym"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "already_submitted");
    assert_eq!(balance(&client, &address, &respondent).await, 5);

    // The answered survey disappears from this respondent's feed.
    assert!(
        feed(&client, &address, &respondent)
            .await
            .iter()
            .all(|s| s["id"].as_i64() != Some(survey_id))
    );

    // History lists the completed response.
    let history: Vec<serde_json::Value> = client
        .get(format!("{}/api/profile/history", address))
        .bearer_auth(&respondent)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["survey_id"].as_i64(), Some(survey_id));
    assert_eq!(history[0]["reward_points"], 5);
}

#[tokio::test]
async fn incomplete_or_misshapen_answers_are_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 2, 5).await;
    let respondent = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;

    // Missing one question entirely.
    let mut partial = full_answer_set(&questions, &["Gym"]);
    let first_qid = questions[0]["id"].as_i64().unwrap().to_string();
    partial["answers"].as_object_mut().unwrap().remove(&first_qid);
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&respondent)
        .json(&partial)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "incomplete_answers");
    assert!(body["error"].as_str().unwrap().contains(&first_qid));

    // Option id from another question's set.
    let mut wrong_option = full_answer_set(&questions, &["Gym"]);
    let choice_qid = questions
        .iter()
        .find(|q| q["question_type"] == "multiple_choice")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    wrong_option["answers"][choice_qid.to_string()] =
        serde_json::json!({ "type": "choice", "option_id": 999_999 });
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&respondent)
        .json(&wrong_option)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Nothing was written: no reward, no history row.
    assert_eq!(balance(&client, &address, &respondent).await, 0);
    let history: Vec<serde_json::Value> = client
        .get(format!("{}/api/profile/history", address))
        .bearer_auth(&respondent)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn quota_is_never_exceeded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    // quota = 1: the first respondent takes the only slot.
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 1, 5).await;

    let first = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&first)
        .json(&full_answer_set(&questions, &["Gym"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // The full survey vanishes from every other user's feed.
    let second = register_user(&client, &address, "Male", "Bandung", "1998-07-07").await;
    assert!(feed(&client, &address, &second).await.is_empty());

    // A direct submit attempt hits the quota gate.
    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&second)
        .json(&full_answer_set(&questions, &["Kantin"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "quota_full");
    assert_eq!(balance(&client, &address, &second).await, 0);
}

#[tokio::test]
async fn racing_submissions_for_the_last_slot_admit_exactly_one() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 1, 5).await;

    let first = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;
    let second = register_user(&client, &address, "Male", "Bandung", "1998-07-07").await;

    let url = format!("{}/api/surveys/{}/responses", address, survey_id);
    let (r1, r2) = tokio::join!(
        client
            .post(&url)
            .bearer_auth(&first)
            .json(&full_answer_set(&questions, &["Gym"]))
            .send(),
        client
            .post(&url)
            .bearer_auth(&second)
            .json(&full_answer_set(&questions, &["Kantin"]))
            .send(),
    );

    let mut statuses = Vec::new();
    for response in [r1.unwrap(), r2.unwrap()] {
        let status = response.status().as_u16();
        let body: serde_json::Value = response.json().await.unwrap();
        if status != 201 {
            // The loser gets the domain error, never a storage-level 500.
            assert_eq!(body["code"], "quota_full");
        }
        statuses.push(status);
    }
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);

    // Exactly one reward was paid out.
    let total =
        balance(&client, &address, &first).await + balance(&client, &address, &second).await;
    assert_eq!(total, 5);
}

#[tokio::test]
async fn report_aggregates_choice_counts_and_text_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 3, 5).await;

    // Respondent 1 checks {Gym, Kantin}; respondent 2 checks {Gym}.
    let r1 = register_user(&client, &address, "Female", "Surabaya", "2000-01-01").await;
    let r2 = register_user(&client, &address, "Male", "Bandung", "1998-07-07").await;
    for (token, labels) in [(&r1, vec!["Gym", "Kantin"]), (&r2, vec!["Gym"])] {
        let response = client
            .post(format!("{}/api/surveys/{}/responses", address, survey_id))
            .bearer_auth(token)
            .json(&full_answer_set(&questions, &labels))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    // Only the owner may read the report.
    let response = client
        .get(format!("{}/api/surveys/{}/report", address, survey_id))
        .bearer_auth(&r1)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let report: serde_json::Value = client
        .get(format!("{}/api/surveys/{}/report", address, survey_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["submitted_count"], 2);

    let question_reports = report["questions"].as_array().unwrap();

    // Check Box: each selected label counts once per response.
    let checkbox = question_reports
        .iter()
        .find(|q| q["question_type"] == "check_box")
        .unwrap();
    let counts = checkbox["counts"].as_array().unwrap();
    let count_of = |label: &str| {
        counts
            .iter()
            .find(|c| c["label"] == label)
            .map(|c| c["count"].as_i64().unwrap())
            .unwrap_or(0)
    };
    assert_eq!(count_of("Gym"), 2);
    assert_eq!(count_of("Kantin"), 1);
    assert_eq!(count_of("Perpus"), 0);

    // Free text: listed, not bucketed.
    let text = question_reports
        .iter()
        .find(|q| q["question_type"] == "short_answer")
        .unwrap();
    assert!(text["counts"].is_null());
    assert_eq!(text["answers"].as_array().unwrap().len(), 2);

    // Single choice: both respondents picked the first option.
    let choice = question_reports
        .iter()
        .find(|q| q["question_type"] == "multiple_choice")
        .unwrap();
    let first_bucket = &choice["counts"].as_array().unwrap()[0];
    assert_eq!(first_bucket["count"], 2);
}

#[tokio::test]
async fn owner_cannot_answer_own_survey() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;
    let (survey_id, questions) =
        published_survey_with_mixed_questions(&client, &address, &owner, 5, 5).await;

    let response = client
        .post(format!("{}/api/surveys/{}/responses", address, survey_id))
        .bearer_auth(&owner)
        .json(&full_answer_set(&questions, &["Gym"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn linear_scale_options_are_ordered_numerically() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_user(&client, &address, "Male", "Jakarta", "1990-01-01").await;
    top_up(&client, &address, &owner, 100).await;

    let survey_id = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({ "title": "Scale", "target_respondents": 5, "reward_points": 1 }),
    )
    .await;
    // Labels inserted out of order; "10" must sort after "2".
    add_question(
        &client,
        &address,
        &owner,
        survey_id,
        serde_json::json!({
            "content": "Scale of 1-10",
            "question_type": "linear_scale",
            "options": ["10", "1", "2"]
        }),
    )
    .await;
    publish(&client, &address, &owner, survey_id).await;

    let questions = survey_questions(&client, &address, &owner, survey_id).await;
    let labels: Vec<&str> = questions[0]["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["content"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["1", "2", "10"]);

    // Non-numeric labels are rejected for linear scales.
    let survey_id = create_draft(
        &client,
        &address,
        &owner,
        serde_json::json!({ "title": "Bad scale", "target_respondents": 5, "reward_points": 1 }),
    )
    .await;
    let response = client
        .post(format!("{}/api/surveys/{}/questions", address, survey_id))
        .bearer_auth(&owner)
        .json(&serde_json::json!({
            "content": "Scale",
            "question_type": "linear_scale",
            "options": ["low", "high"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
