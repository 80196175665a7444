//! OpenAPI documentation
//!
//! Provides an OpenAPI 3.0 document and Swagger UI for the Casemail API.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;

/// Create OpenAPI routes
pub fn create_openapi_routes() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

async fn openapi_json() -> impl IntoResponse {
    Json(get_openapi_spec())
}

async fn swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

fn error_responses() -> serde_json::Value {
    let error = json!({
        "application/json": {
            "schema": {"$ref": "#/components/schemas/ErrorResponse"}
        }
    });
    json!({
        "401": {"description": "Missing or unknown API key", "content": error},
        "403": {"description": "Key may not act for this user", "content": error},
        "422": {"description": "Invalid input", "content": error},
        "500": {"description": "Decryption, SMTP or database failure", "content": error}
    })
}

fn with_errors(mut responses: serde_json::Value) -> serde_json::Value {
    if let (Some(target), serde_json::Value::Object(errors)) =
        (responses.as_object_mut(), error_responses())
    {
        for (status, response) in errors {
            target.entry(status).or_insert(response);
        }
    }
    responses
}

/// Get the OpenAPI specification as JSON
fn get_openapi_spec() -> serde_json::Value {
    let ok_message = json!({
        "application/json": {
            "schema": {"$ref": "#/components/schemas/MessageResponse"}
        }
    });
    let not_found = json!({
        "description": "No settings stored for the user",
        "content": {
            "application/json": {
                "schema": {"$ref": "#/components/schemas/ErrorResponse"}
            }
        }
    });

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Casemail API",
            "description": "Stores per-user SMTP credentials (password encrypted at rest) and relays email through each user's own SMTP server.\n\n## Authentication\n\nAll /api endpoints require an API key.\n\n- **Header**: `X-API-Key: <your-api-key>`\n- **Bearer**: `Authorization: Bearer <your-api-key>`",
            "version": env!("CARGO_PKG_VERSION"),
            "license": {
                "name": "Apache-2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0"
            }
        },
        "tags": [
            {"name": "health", "description": "Health check endpoints"},
            {"name": "email-settings", "description": "Per-user SMTP settings"},
            {"name": "send", "description": "Email relay"}
        ],
        "paths": {
            "/health": {
                "get": {
                    "tags": ["health"],
                    "summary": "Basic health check",
                    "operationId": "health",
                    "responses": {
                        "200": {
                            "description": "Service is healthy",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/HealthResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/health/live": {
                "get": {
                    "tags": ["health"],
                    "summary": "Liveness probe",
                    "operationId": "liveness",
                    "responses": {
                        "200": {"description": "Service is alive"}
                    }
                }
            },
            "/health/ready": {
                "get": {
                    "tags": ["health"],
                    "summary": "Readiness probe",
                    "operationId": "readiness",
                    "responses": {
                        "200": {"description": "Credential store reachable"},
                        "503": {"description": "Credential store unreachable"}
                    }
                }
            },
            "/health/detailed": {
                "get": {
                    "tags": ["health"],
                    "summary": "Detailed health check",
                    "operationId": "healthDetailed",
                    "responses": {
                        "200": {"description": "Detailed health status"}
                    }
                }
            },
            "/api/email-settings": {
                "post": {
                    "tags": ["email-settings"],
                    "summary": "Save SMTP settings for a user (admin key)",
                    "operationId": "saveEmailSettings",
                    "security": [{"api_key": []}, {"bearer": []}],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/SaveEmailSettingsRequest"}
                            }
                        }
                    },
                    "responses": with_errors(json!({
                        "200": {"description": "Settings saved", "content": ok_message}
                    }))
                }
            },
            "/api/email-settings/{userId}": {
                "get": {
                    "tags": ["email-settings"],
                    "summary": "Get SMTP settings for a user, without the password",
                    "operationId": "getEmailSettings",
                    "security": [{"api_key": []}, {"bearer": []}],
                    "parameters": [
                        {
                            "name": "userId",
                            "in": "path",
                            "required": true,
                            "schema": {"type": "string", "format": "uuid"}
                        }
                    ],
                    "responses": with_errors(json!({
                        "200": {
                            "description": "Stored settings",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/EmailSettingsResponse"}
                                }
                            }
                        },
                        "404": not_found
                    }))
                }
            },
            "/api/send-email": {
                "post": {
                    "tags": ["send"],
                    "summary": "Send an email with the user's stored SMTP settings",
                    "operationId": "sendEmail",
                    "security": [{"api_key": []}, {"bearer": []}],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/SendEmailRequest"}
                            }
                        }
                    },
                    "responses": with_errors(json!({
                        "200": {"description": "Email sent", "content": ok_message},
                        "404": not_found
                    }))
                }
            }
        },
        "components": {
            "securitySchemes": {
                "api_key": {
                    "type": "apiKey",
                    "in": "header",
                    "name": "X-API-Key"
                },
                "bearer": {
                    "type": "http",
                    "scheme": "bearer"
                }
            },
            "schemas": {
                "HealthResponse": {
                    "type": "object",
                    "properties": {
                        "status": {"type": "string", "example": "healthy"}
                    }
                },
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": {"type": "string", "example": "NOT_FOUND"},
                        "message": {"type": "string"}
                    }
                },
                "MessageResponse": {
                    "type": "object",
                    "properties": {
                        "message": {"type": "string", "example": "Settings saved"}
                    }
                },
                "SaveEmailSettingsRequest": {
                    "type": "object",
                    "required": ["userId", "smtpServer", "port", "email", "username", "password"],
                    "properties": {
                        "userId": {"type": "string", "format": "uuid"},
                        "smtpServer": {"type": "string", "example": "smtp.gmail.com"},
                        "port": {"type": "integer", "minimum": 1, "maximum": 65535, "example": 465},
                        "email": {"type": "string", "format": "email"},
                        "username": {"type": "string"},
                        "password": {"type": "string", "format": "password"},
                        "useSSL": {"type": "boolean", "default": true}
                    }
                },
                "EmailSettingsResponse": {
                    "type": "object",
                    "properties": {
                        "smtpServer": {"type": "string"},
                        "port": {"type": "integer"},
                        "email": {"type": "string", "format": "email"},
                        "username": {"type": "string"},
                        "useSSL": {"type": "boolean"}
                    }
                },
                "SendEmailRequest": {
                    "type": "object",
                    "required": ["userId", "to"],
                    "properties": {
                        "userId": {"type": "string", "format": "uuid"},
                        "to": {
                            "oneOf": [
                                {"type": "string", "description": "One address or a comma-separated list"},
                                {"type": "array", "items": {"type": "string", "format": "email"}}
                            ]
                        },
                        "subject": {"type": "string"},
                        "body": {"type": "string", "description": "Plain text body"}
                    }
                }
            }
        }
    })
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Casemail API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body { margin: 0; padding: 0; }
        .swagger-ui .topbar { display: none; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis],
            });
        };
    </script>
</body>
</html>"#;
