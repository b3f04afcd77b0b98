//! HTTP-level integration tests for the connector against a local server.

use mockito::{Matcher, Server, ServerGuard};
use mollie_datasource::{
	ConnectorError, ConnectorSettings, DataSourceConnector, Filter, LinkOptions,
	MollieConnector, PaylinkSettings,
};
use serde_json::json;

fn connector_for(server: &ServerGuard) -> MollieConnector {
	let settings = ConnectorSettings::new("test_key").with_endpoint(server.url());
	MollieConnector::from_settings(settings).unwrap()
}

#[tokio::test]
async fn test_create_sends_restricted_payload_and_returns_id() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/v1/payments")
		.match_header("authorization", "Bearer test_key")
		.match_header("accept", "application/json")
		// `rogue` is not in the payment schema and must not be sent
		.match_body(Matcher::Json(json!({
			"amount": 100,
			"description": "Order 42"
		})))
		.with_status(201)
		.with_header("content-type", "application/json")
		.with_body(r#"{"id":"tr_7UhSN1zuXS","status":"open"}"#)
		.expect(1)
		.create_async()
		.await;

	let connector = connector_for(&server);
	let data = json!({ "amount": 100, "description": "Order 42", "rogue": true })
		.as_object()
		.unwrap()
		.clone();
	let id = connector.create("Payment", &data).await.unwrap();
	assert_eq!(id, "tr_7UhSN1zuXS");
	mock.assert_async().await;
}

#[tokio::test]
async fn test_find_coerces_wire_fields() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_7UhSN1zuXS")
		.match_header("authorization", "Bearer test_key")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(
			r#"{
				"id": "tr_7UhSN1zuXS",
				"mode": "test",
				"createdDatetime": "2024-01-01T00:00:00.000Z",
				"status": "open",
				"expiryPeriod": "PT15M",
				"amount": "100.00",
				"details": ""
			}"#,
		)
		.create_async()
		.await;

	let connector = connector_for(&server);
	let record = connector
		.find("Payment", "tr_7UhSN1zuXS")
		.await
		.unwrap()
		.expect("payment should be found");
	assert_eq!(record["createdDatetime"], json!(1_704_067_200_000_i64));
	assert_eq!(record["expiryPeriod"], json!(15.0));
	assert_eq!(record["amount"], json!(100.0));
	// Empty details are dropped on the way in
	assert!(!record.contains_key("details"));
}

#[tokio::test]
async fn test_find_with_empty_body_returns_none() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_empty")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body("{}")
		.create_async()
		.await;

	let connector = connector_for(&server);
	let found = connector.find("Payment", "tr_empty").await.unwrap();
	assert!(found.is_none());
}

#[tokio::test]
async fn test_remote_errors_are_normalized() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_nope")
		.with_status(401)
		.with_header("content-type", "application/json")
		.with_body(r#"{"error":{"type":"request","message":"Unauthorized request"}}"#)
		.create_async()
		.await;

	let connector = connector_for(&server);
	match connector.find("Payment", "tr_nope").await {
		Err(ConnectorError::Remote {
			status,
			message,
			details,
		}) => {
			assert_eq!(status, 401);
			assert_eq!(message, "Unauthorized request");
			assert_eq!(details["type"], json!("request"));
		}
		other => panic!("expected a normalized remote error, got {other:?}"),
	}
}

#[tokio::test]
async fn test_all_with_empty_where_pages_the_collection() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/v1/payments")
		.match_query(Matcher::AllOf(vec![
			Matcher::UrlEncoded("offset".into(), "4".into()),
			Matcher::UrlEncoded("count".into(), "2".into()),
		]))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(
			r#"{
				"totalCount": 6,
				"offset": 4,
				"count": 2,
				"data": [
					{ "id": "tr_a", "amount": "1.00", "expiryPeriod": "PT15M" },
					{ "id": "tr_b", "amount": 2.5 }
				]
			}"#,
		)
		.expect(1)
		.create_async()
		.await;

	let connector = connector_for(&server);
	let filter = Filter {
		offset: Some(4),
		limit: Some(2),
		..Filter::default()
	};
	let items = connector.all("Payment", &filter).await.unwrap();
	assert_eq!(items.len(), 2);
	assert_eq!(items[0]["amount"], json!(1.0));
	assert_eq!(items[0]["expiryPeriod"], json!(15.0));
	assert_eq!(items[1]["amount"], json!(2.5));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_all_by_unknown_id_returns_empty_list() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_missing")
		.with_status(404)
		.with_header("content-type", "application/json")
		.with_body(r#"{"error":{"message":"The payment id is invalid"}}"#)
		.create_async()
		.await;

	let connector = connector_for(&server);
	let items = connector
		.all("Payment", &Filter::by_id("id", "tr_missing"))
		.await
		.unwrap();
	assert!(items.is_empty());
}

#[tokio::test]
async fn test_all_with_non_id_filter_is_unsupported() {
	let server = Server::new_async().await;
	let connector = connector_for(&server);
	let filter = Filter {
		where_clause: Some(
			json!({ "status": "open" }).as_object().unwrap().clone(),
		),
		..Filter::default()
	};
	assert!(matches!(
		connector.all("Payment", &filter).await,
		Err(ConnectorError::Unsupported(_))
	));
}

#[tokio::test]
async fn test_count_reports_total_and_defaults_to_zero() {
	let mut server = Server::new_async().await;
	let with_total = server
		.mock("GET", "/v1/payments")
		.match_query(Matcher::UrlEncoded("count".into(), "1".into()))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"totalCount": 7, "offset": 0, "count": 1, "data": []}"#)
		.expect(1)
		.create_async()
		.await;

	let connector = connector_for(&server);
	assert_eq!(connector.count("Payment").await.unwrap(), 7);
	with_total.assert_async().await;

	let without_total = server
		.mock("GET", "/v1/payments")
		.match_query(Matcher::UrlEncoded("count".into(), "1".into()))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body("{}")
		.expect(1)
		.create_async()
		.await;
	assert_eq!(connector.count("Payment").await.unwrap(), 0);
	without_total.assert_async().await;
}

#[tokio::test]
async fn test_exists_follows_find() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_7UhSN1zuXS")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"id":"tr_7UhSN1zuXS","status":"paid","amount":10}"#)
		.create_async()
		.await;

	let connector = connector_for(&server);
	assert!(connector.exists("Payment", "tr_7UhSN1zuXS").await.unwrap());
}

#[tokio::test]
async fn test_write_verbs_are_unsupported() {
	let server = Server::new_async().await;
	let connector = connector_for(&server);
	let data = json!({ "amount": 1 }).as_object().unwrap().clone();

	assert!(matches!(
		connector.save("Payment", &data).await,
		Err(ConnectorError::Unsupported("save"))
	));
	assert!(matches!(
		connector.destroy("Payment", "tr_x").await,
		Err(ConnectorError::Unsupported("destroy"))
	));
	assert!(matches!(
		connector.destroy_all("Payment", &data).await,
		Err(ConnectorError::Unsupported("destroy_all"))
	));
	assert!(matches!(
		connector.update_attributes("Payment", "tr_x", &data).await,
		Err(ConnectorError::Unsupported("update_attributes"))
	));
}

#[tokio::test]
async fn test_endpoint_override_reroutes_requests() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/v1/payments/tr_local")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"id":"tr_local","amount":1}"#)
		.create_async()
		.await;

	let settings = ConnectorSettings::new("test_key").with_endpoint("https://unreachable.invalid");
	let connector = MollieConnector::from_settings(settings).unwrap();
	connector.set_endpoint(server.url());

	let record = connector.find("Payment", "tr_local").await.unwrap().unwrap();
	assert_eq!(record["id"], json!("tr_local"));
}

#[tokio::test]
async fn test_payment_link_scrapes_url_from_reply() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/xml/ideal")
		.match_query(Matcher::AllOf(vec![
			Matcher::UrlEncoded("a".into(), "create-link".into()),
			Matcher::UrlEncoded("amount".into(), "1000".into()),
			Matcher::UrlEncoded("partnerid".into(), "12345".into()),
			Matcher::UrlEncoded("description".into(), "Order 42".into()),
		]))
		.with_status(200)
		.with_body("<order><URL>https://www.mollie.com/pay/123</URL></order>")
		.expect(1)
		.create_async()
		.await;

	let settings = ConnectorSettings::new("test_key").with_paylink(PaylinkSettings {
		endpoint: format!("{}/xml/ideal", server.url()),
		partnerid: Some("12345".to_string()),
		profile_key: None,
	});
	let connector = MollieConnector::from_settings(settings).unwrap();

	let options = LinkOptions {
		amount: 10.0,
		description: "Order 42".to_string(),
		..LinkOptions::default()
	};
	let url = connector.payment_link(options).await.unwrap();
	assert_eq!(url, "https://www.mollie.com/pay/123");
	mock.assert_async().await;
}

#[tokio::test]
async fn test_payment_link_surfaces_remote_message() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/xml/ideal")
		.match_query(Matcher::Any)
		.with_status(200)
		.with_body("<error><message>A payment profile could not be found</message></error>")
		.create_async()
		.await;

	let settings = ConnectorSettings::new("test_key").with_paylink(PaylinkSettings {
		endpoint: format!("{}/xml/ideal", server.url()),
		partnerid: Some("12345".to_string()),
		profile_key: None,
	});
	let connector = MollieConnector::from_settings(settings).unwrap();

	let options = LinkOptions {
		amount: 10.0,
		description: "Order 42".to_string(),
		..LinkOptions::default()
	};
	match connector.payment_link(options).await {
		Err(ConnectorError::LinkRejected(message)) => {
			assert_eq!(message, "A payment profile could not be found");
		}
		other => panic!("expected a rejected link, got {other:?}"),
	}
}

#[tokio::test]
async fn test_payment_link_default_message_without_url_or_message() {
	let mut server = Server::new_async().await;
	let _mock = server
		.mock("GET", "/xml/ideal")
		.with_status(200)
		.with_body("<order></order>")
		.create_async()
		.await;

	let settings = ConnectorSettings::new("test_key").with_paylink(PaylinkSettings {
		endpoint: format!("{}/xml/ideal", server.url()),
		partnerid: None,
		profile_key: None,
	});
	let connector = MollieConnector::from_settings(settings).unwrap();

	let options = LinkOptions {
		amount: 10.0,
		description: "Order 42".to_string(),
		..LinkOptions::default()
	};
	match connector.payment_link(options).await {
		Err(ConnectorError::LinkRejected(message)) => {
			assert_eq!(message, "Failed to get link");
		}
		other => panic!("expected a rejected link, got {other:?}"),
	}
}
