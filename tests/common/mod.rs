//! Shared fixtures for integration tests

#![allow(dead_code)]

use oasproxy::assembly::ConfigAssembler;
use oasproxy::config::AppConfig;

/// Petstore description in YAML with a scheme-less, port-less server URL
pub const PETSTORE_YAML: &str = r#"
openapi: 3.0.3
x-owner: pets-team
info:
  title: Swagger Petstore
  version: 1.0.0
servers:
  - url: petstore.local/v1
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200':
          description: A paged array of pets
    post:
      operationId: createPets
      responses:
        '201':
          description: Created
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: string
      responses:
        '200':
          description: Expected response to a valid request
"#;

/// Paths declared out of alphabetical order: `/zeta`, `/alpha`, `/mid`
pub const UNSORTED_PATHS_YAML: &str = r#"
openapi: 3.0.0
info:
  title: Ordered
  version: '1'
servers:
  - url: http://ordered.local:8000
paths:
  /zeta:
    get:
      responses:
        '200':
          description: OK
  /alpha:
    get:
      responses:
        '200':
          description: OK
  /mid:
    get:
      responses:
        '200':
          description: OK
"#;

pub fn config_with_default_port(port: u16) -> AppConfig {
    let mut config = AppConfig::default();
    config.envoy.api_default_port = port;
    config
}

pub fn assembler() -> ConfigAssembler {
    ConfigAssembler::from_config(&AppConfig::default())
}

