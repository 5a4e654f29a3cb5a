use crate::CloserWorld;
use chrono::NaiveDate;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use milestone_closer::chat::message::render_message;
use milestone_closer::config::{ChatConfig, Config, FailurePolicy, TrackerConfig};
use milestone_closer::run::{Outcome, run};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

const TOKEN: &str = "glpat-acceptance";
const GROUP: u64 = 42;
const CHANNEL: &str = "#releases";
const AUTH_TOKEN: &str = "auth-acceptance";

#[given(regex = r#"^today is "(\d{4}-\d{2}-\d{2})"$"#)]
async fn given_today(world: &mut CloserWorld, date: String) {
    world.today = Some(NaiveDate::parse_from_str(&date, "%Y-%m-%d").expect("valid date"));
}

#[given(regex = r#"^the message template is "(.*)"$"#)]
async fn given_message_template(world: &mut CloserWorld, template: String) {
    world.message_template = template;
}

#[given("the group has the milestones:")]
async fn given_milestones(world: &mut CloserWorld, step: &Step) {
    let table = step.table.as_ref().expect("milestone table required");
    world.milestones = table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            json!({
                "id": row[0].parse::<u64>().expect("numeric id"),
                "group_id": GROUP,
                "title": row[1],
                "state": "active",
                "due_date": row[2],
                "start_date": "2024-01-01",
            })
        })
        .collect();
}

#[given(regex = r#"^milestone (\d+) has issues in states "(.*)"$"#)]
async fn given_issue_states(world: &mut CloserWorld, id: u64, states: String) {
    let states = states
        .split(',')
        .map(|state| state.trim().to_string())
        .filter(|state| !state.is_empty())
        .collect();
    world.issue_states.insert(id, states);
}

#[given(regex = r#"^milestone (\d+) has no issues$"#)]
async fn given_no_issues(world: &mut CloserWorld, id: u64) {
    world.issue_states.insert(id, Vec::new());
}

#[given(regex = r#"^the tracker answers the close of milestone (\d+) with state "(.*)"$"#)]
async fn given_close_state(world: &mut CloserWorld, id: u64, state: String) {
    world.close_states.insert(id, state);
}

#[given(regex = r#"^the tracker fails listing issues of milestone (\d+) with status (\d+)$"#)]
async fn given_failing_issues(world: &mut CloserWorld, id: u64, status: usize) {
    world.failing_issue_requests.insert(id, status);
}

#[given("the chat service rejects the login")]
async fn given_login_rejected(world: &mut CloserWorld) {
    world.chat_login_rejected = true;
}

async fn start_servers(world: &mut CloserWorld) {
    let mut gitlab = Server::new_async().await;
    let mut rocket = Server::new_async().await;

    gitlab
        .mock("GET", "/api/v4/groups/42/milestones")
        .match_query(Matcher::UrlEncoded("state".into(), "active".into()))
        .match_header("private-token", TOKEN)
        .with_status(200)
        .with_body(serde_json::Value::from(world.milestones.clone()).to_string())
        .create_async()
        .await;

    for milestone in &world.milestones {
        let id = milestone["id"].as_u64().expect("id");
        let title = milestone["title"].as_str().expect("title");

        let issues_path = format!("/api/v4/groups/42/milestones/{id}/issues");
        let issues_mock = match world.failing_issue_requests.get(&id) {
            Some(status) => gitlab
                .mock("GET", issues_path.as_str())
                .match_query(Matcher::Any)
                .with_status(*status)
                .with_body(r#"{"message": "500 Internal Server Error"}"#),
            None => {
                let issues: Vec<serde_json::Value> = world
                    .issue_states
                    .get(&id)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .enumerate()
                    .map(|(n, state)| json!({"id": id * 100 + n as u64, "state": state}))
                    .collect();
                gitlab
                    .mock("GET", issues_path.as_str())
                    .match_query(Matcher::Any)
                    .match_header("private-token", TOKEN)
                    .with_status(200)
                    .with_body(serde_json::Value::from(issues).to_string())
            }
        };
        world
            .issue_mocks
            .insert(id, issues_mock.expect(1).create_async().await);

        let close_state = world
            .close_states
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "closed".to_string());
        let close_mock = gitlab
            .mock("PUT", format!("/api/v4/groups/42/milestones/{id}").as_str())
            .match_header("private-token", TOKEN)
            .match_body(Matcher::Json(json!({"state_event": "close"})))
            .with_status(200)
            .with_body(json!({"id": id, "title": title, "state": close_state}).to_string())
            .expect(1)
            .create_async()
            .await;
        world.close_mocks.insert(id, close_mock);

        let post_mock = rocket
            .mock("POST", "/api/v1/chat.postMessage")
            .match_header("x-auth-token", AUTH_TOKEN)
            .match_body(Matcher::Json(json!({
                "channel": CHANNEL,
                "text": render_message(&world.message_template, title),
            })))
            .with_status(200)
            .with_body(json!({"success": true}).to_string())
            .expect(1)
            .create_async()
            .await;
        world.post_mocks.insert(title.to_string(), post_mock);
    }

    let login_body = if world.chat_login_rejected {
        json!({"status": "error", "error": "Unauthorized", "message": "Unauthorized"})
    } else {
        json!({"status": "success", "data": {"authToken": AUTH_TOKEN, "userId": "bot-1"}})
    };
    rocket
        .mock("POST", "/api/v1/login")
        .with_status(if world.chat_login_rejected { 401 } else { 200 })
        .with_body(login_body.to_string())
        .create_async()
        .await;

    world.gitlab = Some(gitlab);
    world.rocket = Some(rocket);
}

async fn run_closer(world: &mut CloserWorld, policy: FailurePolicy) {
    start_servers(world).await;

    let config = Config {
        tracker: TrackerConfig {
            base_url: world.gitlab.as_ref().expect("gitlab server").url(),
            token: TOKEN.to_string(),
            group_id: GROUP,
        },
        chat: ChatConfig {
            base_url: world.rocket.as_ref().expect("rocket server").url(),
            user: "release-bot".to_string(),
            password: "secret".to_string(),
            channel: CHANNEL.to_string(),
            message_template: world.message_template.clone(),
        },
        workers: 1,
        failure_policy: policy,
        timeout: Duration::from_secs(10),
    };
    let today = world.today.expect("today must be set");

    let mut captured = Vec::new();
    let result = run(
        &config,
        today,
        Some(&mut captured as &mut dyn std::io::Write),
    )
    .await;
    world.captured_output = captured;
    world.run_result = Some(result);
}

#[when("the closer runs")]
async fn when_closer_runs(world: &mut CloserWorld) {
    run_closer(world, FailurePolicy::Abort).await;
}

#[when("the closer runs skipping failed milestones")]
async fn when_closer_runs_skipping(world: &mut CloserWorld) {
    run_closer(world, FailurePolicy::Skip).await;
}

#[then("the run succeeds")]
async fn then_run_succeeds(world: &mut CloserWorld) {
    let result = world.run_result.as_ref().expect("closer has not run");
    assert!(result.is_ok(), "run failed: {:?}", result);
}

#[then(regex = r#"^the run fails mentioning "(.*)"$"#)]
async fn then_run_fails(world: &mut CloserWorld, text: String) {
    match world.run_result.as_ref().expect("closer has not run") {
        Ok(report) => panic!("expected the run to fail, got {report:?}"),
        Err(err) => assert!(
            format!("{err:#}").contains(&text),
            "error '{err:#}' does not mention '{text}'"
        ),
    }
}

#[then(regex = r#"^milestone (\d+) is closed$"#)]
async fn then_milestone_closed(world: &mut CloserWorld, id: u64) {
    assert!(
        world.close_mocks[&id].matched_async().await,
        "milestone {id} was not closed exactly once"
    );
}

#[then(regex = r#"^milestone (\d+) is not closed$"#)]
async fn then_milestone_not_closed(world: &mut CloserWorld, id: u64) {
    assert!(
        !world.close_mocks[&id].matched_async().await,
        "milestone {id} was closed"
    );
}

#[then(regex = r#"^issues of milestone (\d+) are requested$"#)]
async fn then_issues_requested(world: &mut CloserWorld, id: u64) {
    assert!(
        world.issue_mocks[&id].matched_async().await,
        "issues of milestone {id} were not requested exactly once"
    );
}

#[then(regex = r#"^issues of milestone (\d+) are not requested$"#)]
async fn then_issues_not_requested(world: &mut CloserWorld, id: u64) {
    assert!(
        !world.issue_mocks[&id].matched_async().await,
        "issues of milestone {id} were requested"
    );
}

#[then(regex = r#"^exactly one chat message is posted, for "(.*)"$"#)]
async fn then_one_message_for(world: &mut CloserWorld, title: String) {
    for (mock_title, mock) in &world.post_mocks {
        let matched = mock.matched_async().await;
        if *mock_title == title {
            assert!(matched, "no message posted for {title}");
        } else {
            assert!(!matched, "unexpected message posted for {mock_title}");
        }
    }
}

#[then("no chat message is posted")]
async fn then_no_message(world: &mut CloserWorld) {
    for (title, mock) in &world.post_mocks {
        assert!(!mock.matched_async().await, "message posted for {title}");
    }
}

#[then(regex = r#"^milestone "(.*)" is reported as (not due|without issues|(?:\d+)% closed|closed|rejected|failed)$"#)]
async fn then_reported_as(world: &mut CloserWorld, title: String, outcome: String) {
    let report = match world.run_result.as_ref().expect("closer has not run") {
        Ok(report) => report,
        Err(err) => panic!("run failed: {err:#}"),
    };
    let entry = report
        .milestones
        .iter()
        .find(|m| m.title == title)
        .unwrap_or_else(|| panic!("{title} missing from report"));

    let matches = match (outcome.as_str(), &entry.outcome) {
        ("not due", Outcome::NotDue) => true,
        ("without issues", Outcome::NoIssues) => true,
        ("closed", Outcome::Closed { .. }) => true,
        ("rejected", Outcome::CloseRejected(_)) => true,
        ("failed", Outcome::Failed(_)) => true,
        (text, Outcome::Incomplete(percent)) => *text == format!("{percent}% closed"),
        _ => false,
    };
    assert!(matches, "{title} reported as {:?}, expected {outcome}", entry.outcome);
}

#[then("the output should be:")]
async fn then_output_should_be(world: &mut CloserWorld, step: &Step) {
    let expected = step.docstring.as_ref().expect("docstring required");
    let output = String::from_utf8(world.captured_output.clone()).expect("Invalid UTF-8");
    assert_eq!(
        output.trim_end(),
        expected.trim(),
        "Expected output '{}', but got:\n---\n{}\n---",
        expected.trim(),
        output.trim_end()
    );
}
