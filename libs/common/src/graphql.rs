use std::fmt::{Display, Formatter};

use graphql_parser::{
  parse_query,
  query::{Definition, Document, OperationDefinition, ParseError},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json::log_json;

/// A single GraphQL operation flowing through a link chain.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GraphQLRequest {
  // The GraphQL operation, as string
  #[serde(rename = "query")]
  pub operation: String,
  // The operation name, if specified
  #[serde(rename = "operationName")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub operation_name: Option<String>,
  // GraphQL operation variables, in JSON format
  pub variables: Option<Map<String, Value>>,
  // GraphQL execution extensions, in JSON format
  #[serde(skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Map<String, Value>>,
}

#[cfg(feature = "test_utils")]
impl Default for GraphQLRequest {
  fn default() -> Self {
    GraphQLRequest {
      operation: "query { __typename }".to_string(),
      operation_name: None,
      variables: None,
      extensions: None,
    }
  }
}

impl Display for GraphQLRequest {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", log_json(self))
  }
}

impl GraphQLRequest {
  /// The default log label for an operation: the operation name, with the
  /// JSON-encoded variables appended when there are any.
  ///
  /// `GetUser` with no variables formats as `GetUser`; with `{"id": 5}` it
  /// formats as `GetUser({"id":5})`.
  pub fn log_label(&self) -> String {
    let name = self.operation_name.as_deref().unwrap_or("<anonymous>");

    match &self.variables {
      Some(variables) if !variables.is_empty() => format!("{}({})", name, log_json(variables)),
      _ => name.to_string(),
    }
  }
}

/// An error with a message and optional extensions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphQLError {
  /// The error message.
  pub message: String,
  /// Extensions to the error.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Map<String, Value>>,
}

impl Display for GraphQLError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl GraphQLError {
  pub fn new(message: &str) -> Self {
    GraphQLError {
      message: message.to_string(),
      extensions: None,
    }
  }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GraphQLResponse {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub errors: Option<Vec<GraphQLError>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Value>,
}

impl GraphQLResponse {
  pub fn new_data(data: Value) -> Self {
    GraphQLResponse {
      data: Some(data),
      errors: None,
      extensions: None,
    }
  }

  pub fn new_error(error: &str) -> Self {
    GraphQLResponse {
      data: None,
      errors: Some(vec![GraphQLError::new(error)]),
      extensions: None,
    }
  }
}

/// The kind of the operation a request executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Query,
  Mutation,
  Subscription,
}

pub type ParsedGraphQLDocument = Document<'static, String>;

#[derive(Debug, Clone)]
pub struct ParsedGraphQLRequest {
  pub request: GraphQLRequest,
  pub parsed_operation: ParsedGraphQLDocument,
}

impl ParsedGraphQLRequest {
  pub fn create_and_parse(raw_request: GraphQLRequest) -> Result<Self, ParseError> {
    parse_graphql_operation(&raw_request.operation).map(|parsed_operation| ParsedGraphQLRequest {
      request: raw_request,
      parsed_operation,
    })
  }

  pub fn executable_operation(&self) -> Option<&Definition<'static, String>> {
    match &self.request.operation_name {
      Some(op_name) => self.parsed_operation.definitions.iter().find(|v| {
        if let Definition::Operation(op) = v {
          let name: &Option<String> = match op {
            OperationDefinition::SelectionSet(_) => &None,
            OperationDefinition::Query(query) => &query.name,
            OperationDefinition::Mutation(mutation) => &mutation.name,
            OperationDefinition::Subscription(subscription) => &subscription.name,
          };

          if let Some(actual_name) = name {
            return actual_name == op_name;
          }
        }

        false
      }),
      _ => self.parsed_operation.definitions.iter().find(|v| {
        if let Definition::Operation(_) = v {
          return true;
        }

        false
      }),
    }
  }

  /// The kind of the operation selected for execution, if any matches the
  /// requested operation name.
  pub fn operation_kind(&self) -> Option<OperationKind> {
    match self.executable_operation() {
      Some(Definition::Operation(op)) => Some(match op {
        OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => {
          OperationKind::Query
        }
        OperationDefinition::Mutation(_) => OperationKind::Mutation,
        OperationDefinition::Subscription(_) => OperationKind::Subscription,
      }),
      _ => None,
    }
  }

  pub fn is_running_subscription(&self) -> bool {
    matches!(self.operation_kind(), Some(OperationKind::Subscription))
  }
}

pub fn parse_graphql_operation(operation_str: &str) -> Result<ParsedGraphQLDocument, ParseError> {
  parse_query::<String>(operation_str).map(|v| v.into_static())
}
