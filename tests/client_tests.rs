use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use heatrisk::{
    amedas_station::AmedasStation,
    client::{Endpoint, HeatRiskClient},
    photo::ImageSelection,
    request::{build_payload, HeatRiskRequest, RequestTarget},
    response::{Outcome, CONNECTION_FAILURE_ERROR},
    risk::AgeGroup,
};

extern crate heatrisk;

const OK_BODY: &str = r#"{"observation": {"station": "東京", "station_id": "44132"}, "wbgt_analysis": {"wbgt": 24.5}}"#;

/// Serves one canned response per connection and hands back the raw requests
async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut stream).await);

            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        requests
    });

    (base_url, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buffer).to_string()
}

/// Accepts connections and never answers them
async fn silent_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/heat", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    url
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/heat", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn client(endpoints: Vec<Endpoint>) -> HeatRiskClient {
    HeatRiskClient::new(endpoints, Duration::from_secs(5)).unwrap()
}

fn tokyo_request() -> HeatRiskRequest {
    let station = AmedasStation::new("44132", "東京", (35.6895, 139.6917), "tokyo", "kanto");
    let target = RequestTarget::from(&station);
    build_payload(AgeGroup::Infant, Some(&target), &ImageSelection::new())
}

#[tokio::test]
async fn post_success() {
    let (base_url, server) = serve(vec![(200, OK_BODY.to_string())]).await;
    let client = client(vec![Endpoint::Post {
        url: format!("{base_url}/heat"),
    }]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.response().heat_index(), Some(24.5));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /heat"));
    assert!(requests[0].contains(r#""age_group":"0-1""#));
    assert!(requests[0].contains(r#""station_id":"44132""#));
}

#[tokio::test]
async fn falls_back_to_get_after_server_error() {
    let (base_url, server) = serve(vec![
        (500, r#"{"detail": "boom"}"#.to_string()),
        (200, OK_BODY.to_string()),
    ])
    .await;
    let client = client(vec![
        Endpoint::Post {
            url: format!("{base_url}/heat"),
        },
        Endpoint::Get {
            url: format!("{base_url}/heat"),
        },
    ]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(outcome.is_success());

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].starts_with("GET /heat?"));
    assert!(requests[1].contains("age_group=0-1"));
    assert!(requests[1].contains("station_id=44132"));
}

#[tokio::test]
async fn unwraps_relay_contents() {
    let wrapped = serde_json::json!({ "contents": OK_BODY }).to_string();
    let (base_url, server) = serve(vec![(200, wrapped)]).await;
    let client = client(vec![
        Endpoint::Post {
            url: closed_port_url().await,
        },
        Endpoint::WrappedGet {
            url: format!("{base_url}/get"),
            target: "https://api.example.com/heat".to_string(),
        },
    ]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.response().observed_station_id(), Some("44132"));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /get?url=https"));
}

#[tokio::test]
async fn empty_relay_contents_is_a_failure() {
    let (base_url, _server) = serve(vec![(200, r#"{"contents": null}"#.to_string())]).await;
    let client = client(vec![Endpoint::WrappedGet {
        url: format!("{base_url}/get"),
        target: "https://api.example.com/heat".to_string(),
    }]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(!outcome.is_success());
    assert_eq!(
        outcome.response().error.as_deref(),
        Some(CONNECTION_FAILURE_ERROR)
    );
}

#[tokio::test]
async fn all_endpoints_failing_gives_one_failure() {
    let (base_url, server) = serve(vec![(503, String::new())]).await;
    let client = client(vec![
        Endpoint::Post {
            url: closed_port_url().await,
        },
        Endpoint::Get {
            url: format!("{base_url}/heat"),
        },
    ]);

    let outcome = client.submit(&tokyo_request()).await;
    let response = outcome.response();
    assert!(!outcome.is_success());
    assert_eq!(response.error.as_deref(), Some(CONNECTION_FAILURE_ERROR));
    assert!(response.timestamp.is_some());
    assert!(response.ai_features.as_ref().unwrap().fallback_mode);

    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn no_endpoints_gives_failure() {
    let outcome = client(Vec::new()).submit(&tokyo_request()).await;
    assert!(matches!(outcome, Outcome::Failure(_)));
}

#[tokio::test]
async fn backend_error_payload_is_final() {
    let error_body = r#"{"error": "観測データ取得失敗", "message": "データなし"}"#;
    let (base_url, server) = serve(vec![(200, error_body.to_string())]).await;
    let client = client(vec![
        Endpoint::Post {
            url: format!("{base_url}/heat"),
        },
        Endpoint::Get {
            url: format!("{base_url}/heat"),
        },
    ]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.response().error.as_deref(), Some("観測データ取得失敗"));

    // The second endpoint is never tried
    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn silent_endpoint_times_out_and_falls_back() {
    let (base_url, server) = serve(vec![(200, OK_BODY.to_string())]).await;
    let client = HeatRiskClient::new(
        vec![
            Endpoint::Post {
                url: silent_url().await,
            },
            Endpoint::Get {
                url: format!("{base_url}/heat"),
            },
        ],
        Duration::from_secs(1),
    )
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), client.submit(&tokyo_request()))
        .await
        .expect("submit did not honor the request timeout");
    assert!(outcome.is_success());
    assert_eq!(outcome.response().heat_index(), Some(24.5));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /heat?"));
}

#[tokio::test]
async fn silent_endpoint_alone_gives_one_failure() {
    let client = HeatRiskClient::new(
        vec![Endpoint::Post {
            url: silent_url().await,
        }],
        Duration::from_secs(1),
    )
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), client.submit(&tokyo_request()))
        .await
        .expect("submit did not honor the request timeout");
    assert!(matches!(outcome, Outcome::Failure(_)));
    assert_eq!(
        outcome.response().error.as_deref(),
        Some(CONNECTION_FAILURE_ERROR)
    );
}

#[tokio::test]
async fn loose_ai_blocks_still_succeed() {
    let body = r#"{"wbgt_analysis": {"wbgt": 27.3}, "safety_recommendations": {"general": ["水分補給"], "age_specific": {"2-3": ["帽子"]}}, "image_analysis": {"environmental_factors": "晴天"}}"#;
    let (base_url, server) = serve(vec![(200, body.to_string())]).await;
    let client = client(vec![
        Endpoint::Post {
            url: format!("{base_url}/heat"),
        },
        Endpoint::Get {
            url: format!("{base_url}/heat"),
        },
    ]);

    let outcome = client.submit(&tokyo_request()).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.response().heat_index(), Some(27.3));
    assert_eq!(
        outcome.response().safety_recommendations.as_ref().unwrap().age_specific,
        vec!["帽子"]
    );

    // Answered by the first endpoint
    assert_eq!(server.await.unwrap().len(), 1);
}
