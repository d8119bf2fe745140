use mockito::{Matcher, Server};
use org_pr_scanner::config::{MergeMethod, Visibility};
use org_pr_scanner::error::HostError;
use org_pr_scanner::github::{CheckState, GitHubClient, Mergeable, PullRequestHost, Repository};
use pretty_assertions::assert_eq;
use serde_json::json;

fn client(server: &Server) -> GitHubClient {
    GitHubClient::new("test-token".to_string(), Some(server.url().as_str())).unwrap()
}

fn widgets() -> Repository {
    Repository {
        owner: "acme".to_string(),
        name: "widgets".to_string(),
        html_url: "https://github.com/acme/widgets".to_string(),
        archived: false,
        visibility: Visibility::Public,
    }
}

fn repo_json(name: &str, visibility: &str, archived: bool) -> serde_json::Value {
    json!({
        "name": name,
        "html_url": format!("https://github.com/acme/{}", name),
        "archived": archived,
        "private": visibility != "public",
        "visibility": visibility,
        "owner": { "login": "acme" }
    })
}

fn pr_node(number: u64, author: &str, created_at: &str) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("PR {}", number),
        "url": format!("https://github.com/acme/widgets/pull/{}", number),
        "createdAt": created_at,
        "author": { "login": author },
        "mergeable": "MERGEABLE",
        "changedFiles": 1,
        "files": { "nodes": [{ "path": ".github/workflows/ci.yml" }] },
        "commits": { "nodes": [{ "commit": { "statusCheckRollup": { "contexts": { "nodes": [
            { "__typename": "CheckRun", "name": "Tests", "status": "COMPLETED", "conclusion": "SUCCESS" }
        ] } } } }] }
    })
}

#[tokio::test]
async fn lists_repositories_across_pages() {
    let mut server = Server::new_async().await;

    let first_page: Vec<serde_json::Value> = (0..100)
        .map(|i| repo_json(&format!("repo-{}", i), "public", false))
        .collect();
    let page_one = server
        .mock("GET", "/orgs/acme/repos")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
            Matcher::UrlEncoded("type".into(), "all".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::Value::Array(first_page).to_string())
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/orgs/acme/repos")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([repo_json("tools", "internal", true)]).to_string())
        .create_async()
        .await;

    let repositories = client(&server).list_repositories("acme").await.unwrap();

    page_one.assert_async().await;
    page_two.assert_async().await;
    assert_eq!(repositories.len(), 101);
    let last = repositories.last().unwrap();
    assert_eq!(last.name, "tools");
    assert_eq!(last.visibility, Visibility::Internal);
    assert!(last.archived);
}

#[tokio::test]
async fn lists_open_pull_requests_following_cursor() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("POST", "/graphql")
        .match_body(Matcher::PartialJson(json!({
            "variables": { "owner": "acme", "name": "widgets", "after": null }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": { "repository": { "pullRequests": {
                "pageInfo": { "hasNextPage": true, "endCursor": "cursor-1" },
                "nodes": [pr_node(1, "dependabot", "2024-01-01T00:00:00Z")]
            } } } })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("POST", "/graphql")
        .match_body(Matcher::PartialJson(json!({
            "variables": { "after": "cursor-1" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": { "repository": { "pullRequests": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [pr_node(2, "octocat", "2024-02-01T00:00:00Z")]
            } } } })
            .to_string(),
        )
        .create_async()
        .await;

    let prs = client(&server)
        .list_open_pull_requests(&widgets())
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(prs.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(prs[0].repository, "widgets");
    assert_eq!(prs[0].author.as_deref(), Some("dependabot"));
    assert_eq!(prs[0].mergeable, Mergeable::Mergeable);
    assert_eq!(prs[0].check_state(), CheckState::Success);
    assert!(!prs[0].files_truncated);
}

#[tokio::test]
async fn graphql_errors_become_host_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": { "repository": null },
                "errors": [{ "message": "Could not resolve to a Repository with the name 'acme/widgets'." }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(&server)
        .list_open_pull_requests(&widgets())
        .await
        .unwrap_err();

    match err {
        HostError::GraphQl(message) => assert!(message.contains("Could not resolve")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn merges_with_requested_method() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/repos/acme/widgets/pulls/7/merge")
        .match_body(Matcher::PartialJson(json!({ "merge_method": "squash" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
                "merged": true,
                "message": "Pull Request successfully merged"
            })
            .to_string(),
        )
        .create_async()
        .await;

    client(&server)
        .merge_pull_request(&widgets(), 7, MergeMethod::Squash)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_merge_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/repos/acme/widgets/pulls/7/merge")
        .with_status(405)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": "Pull Request is not mergeable",
                "documentation_url": "https://docs.github.com/rest/pulls/pulls#merge-a-pull-request"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server)
        .merge_pull_request(&widgets(), 7, MergeMethod::Squash)
        .await;

    assert!(matches!(result, Err(HostError::Api(_))));
}

#[tokio::test]
async fn looks_up_repository_visibility() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/repos/acme/.github")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(repo_json(".github", "private", false).to_string())
        .create_async()
        .await;

    let visibility = client(&server)
        .repository_visibility("acme/.github")
        .await
        .unwrap();

    assert_eq!(visibility, Visibility::Private);
}
