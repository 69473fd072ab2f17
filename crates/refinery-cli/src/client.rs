//! Async HTTP client for the ACT platform REST API.

use std::time::Duration;

use refinery_core::{
  backend::SearchBackend,
  model::{ActFact, ActObject, SearchResult},
  search::{ObjectSearch, Search},
};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;

use crate::error::ClientError;

const USER_ID_HEADER: &str = "ACT-User-ID";

/// Platform flag on facts that have at least one retraction.
const RETRACTED_FLAG: &str = "Retracted";

/// Connection settings for the platform API.
#[derive(Debug, Clone)]
pub struct ActConfig {
  pub base_url: String,
  pub user_id:  String,
  pub timeout:  Duration,
}

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ActClient {
  client:   Client,
  base_url: Url,
  user_id:  String,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  messages: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
  message: String,
}

/// One element of a traversal result. Traversals may also yield plain
/// values, which are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraverseElement {
  Fact(Box<ActFact>),
  Object(ActObject),
  Other(serde_json::Value),
}

fn collect_traversal(elements: Vec<TraverseElement>) -> SearchResult {
  let mut facts = Vec::new();
  let mut objects = Vec::new();
  for element in elements {
    match element {
      TraverseElement::Fact(f) => facts.push(*f),
      TraverseElement::Object(o) => objects.push(o),
      TraverseElement::Other(_) => {}
    }
  }
  let mut result = SearchResult::from_facts(facts);
  result
    .objects
    .extend(objects.into_iter().map(|o| (o.id.clone(), o)));
  result
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl ActClient {
  pub fn new(config: ActConfig) -> Result<Self, ClientError> {
    let base_url = Url::parse(&config.base_url)
      .ok()
      .filter(|u| !u.cannot_be_a_base())
      .ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      client,
      base_url,
      user_id: config.user_id,
    })
  }

  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
    let resp = req.header(USER_ID_HEADER, &self.user_id).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body: ErrorBody = resp.json().await.unwrap_or_default();
      return Err(ClientError::Status {
        status:   status.as_u16(),
        messages: body.messages.into_iter().map(|m| m.message).collect(),
      });
    }
    let envelope: Envelope<T> = resp.json().await?;
    Ok(envelope.data)
  }

  /// `POST /v1/traverse/object/{type}/{value}`
  async fn traverse(&self, search: &ObjectSearch, query: &str) -> Result<SearchResult, ClientError> {
    let url = self.url(&[
      "v1",
      "traverse",
      "object",
      &search.object_type,
      &search.object_value,
    ]);
    let elements: Vec<TraverseElement> = self
      .send(self.client.post(url).json(&json!({ "query": query })))
      .await?;
    Ok(collect_traversal(elements))
  }

  /// `POST /v1/object/{type}/{value}/facts`
  async fn object_facts(&self, search: &ObjectSearch) -> Result<SearchResult, ClientError> {
    let url = self.url(&[
      "v1",
      "object",
      &search.object_type,
      &search.object_value,
      "facts",
    ]);
    let mut body = json!({ "includeRetracted": true });
    if !search.fact_types.is_empty() {
      body["factType"] = json!(search.fact_types);
    }
    let facts: Vec<ActFact> = self.send(self.client.post(url).json(&body)).await?;
    Ok(SearchResult::from_facts(facts))
  }

  /// `GET /v1/fact/uuid/{id}`
  async fn fact_by_id(&self, id: &str) -> Result<SearchResult, ClientError> {
    let url = self.url(&["v1", "fact", "uuid", id]);
    let fact: ActFact = self.send(self.client.get(url)).await?;
    Ok(SearchResult::from_facts([fact]))
  }

  /// `GET /v1/fact/uuid/{id}/meta?factType=Retraction`
  async fn retractions_of(&self, id: &str) -> Result<Vec<ActFact>, ClientError> {
    let url = self.url(&["v1", "fact", "uuid", id, "meta"]);
    self
      .send(self.client.get(url).query(&[("factType", "Retraction")]))
      .await
  }

  /// Fetch the retraction facts for every fact flagged as retracted.
  async fn with_retractions(&self, mut result: SearchResult) -> Result<SearchResult, ClientError> {
    let flagged: Vec<String> = result
      .facts
      .values()
      .filter(|f| f.flags.iter().any(|flag| flag == RETRACTED_FLAG))
      .map(|f| f.id.clone())
      .collect();
    for id in flagged {
      for r in self.retractions_of(&id).await? {
        result.facts.insert(r.id.clone(), r);
      }
    }
    Ok(result)
  }
}

impl SearchBackend for ActClient {
  type Error = ClientError;

  async fn execute(&self, search: &Search) -> Result<SearchResult, ClientError> {
    let result = match search {
      Search::Object(s) => match s.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => self.traverse(s, query).await?,
        None => self.object_facts(s).await?,
      },
      Search::Fact(s) => self.fact_by_id(&s.id).await?,
    };
    let result = self.with_retractions(result).await?;
    debug!(
      %search,
      facts = result.facts.len(),
      objects = result.objects.len(),
      "search complete"
    );
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ActClient {
    ActClient::new(ActConfig {
      base_url: base.into(),
      user_id:  "1".into(),
      timeout:  Duration::from_secs(1),
    })
    .unwrap()
  }

  #[test]
  fn url_segments_are_escaped() {
    let c = client("http://act.example.com/api/");
    let url = c.url(&["v1", "object", "uri", "http://x/y z"]);
    assert_eq!(
      url.as_str(),
      "http://act.example.com/api/v1/object/uri/http:%2F%2Fx%2Fy%20z"
    );
  }

  #[test]
  fn rejects_unusable_base_url() {
    let err = ActClient::new(ActConfig {
      base_url: "mailto:someone@example.com".into(),
      user_id:  "1".into(),
      timeout:  Duration::from_secs(1),
    })
    .err()
    .unwrap();
    assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
  }

  #[test]
  fn traversal_splits_facts_and_objects() {
    let body = serde_json::json!({
      "data": [
        {
          "id": "o1",
          "type": { "id": "t1", "name": "threatActor" },
          "value": "Axiom"
        },
        {
          "id": "f1",
          "type": { "id": "t2", "name": "alias" },
          "value": "Axiom2",
          "timestamp": "2017-10-09T13:07:24.000Z",
          "sourceObject": {
            "id": "o1",
            "type": { "id": "t1", "name": "threatActor" },
            "value": "Axiom"
          },
          "destinationObject": {
            "id": "o2",
            "type": { "id": "t1", "name": "threatActor" },
            "value": "Axiom2"
          },
          "bidirectionalBinding": true
        },
        42
      ]
    });
    let envelope: Envelope<Vec<TraverseElement>> = serde_json::from_value(body).unwrap();
    let result = collect_traversal(envelope.data);

    assert_eq!(result.facts.len(), 1);
    assert_eq!(result.objects.len(), 2);
    assert!(result.facts["f1"].bidirectional_binding);
  }

  #[test]
  fn status_error_lists_messages() {
    let err = ClientError::Status {
      status:   403,
      messages: vec!["Access denied".into(), "try again".into()],
    };
    assert_eq!(err.to_string(), "platform returned 403: Access denied; try again");
  }
}
