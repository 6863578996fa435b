use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Replay CDN events against a running edge simulator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Object-store domain placed on the synthetic request's origin.
    #[arg(long, default_value = "assets.s3.us-east-1.amazonaws.com")]
    domain: String,

    #[arg(long, default_value = "us-east-1")]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the origin-request hook for a uri
    Request {
        uri: String,
        /// Query string without the leading '?'
        #[arg(short, long, default_value = "")]
        querystring: String,
        /// Extra headers as name=value
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Run the origin-response hook for a uri and an origin status
    Response {
        uri: String,
        #[arg(short, long, default_value_t = 200)]
        status: u16,
        /// Origin response headers as name=value
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let (path, payload) = match &cli.command {
        Commands::Request {
            uri,
            querystring,
            headers,
        } => {
            let request = synthetic_request(&cli, uri, querystring, headers)?;
            ("/__edge/origin-request", event("origin-request", request, None))
        }
        Commands::Response {
            uri,
            status,
            headers,
        } => {
            let request = synthetic_request(&cli, uri, "", &[])?;
            let response = json!({
                "status": status.to_string(),
                "statusDescription": "",
                "headers": cf_headers(headers)?,
            });
            ("/__edge/origin-response", event("origin-response", request, Some(response)))
        }
    };

    let res = client
        .post(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .json(&payload)
        .send()
        .await?;
    print_response(res).await
}

fn synthetic_request(
    cli: &Cli,
    uri: &str,
    querystring: &str,
    headers: &[String],
) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(json!({
        "clientIp": "127.0.0.1",
        "method": "GET",
        "uri": uri,
        "querystring": querystring,
        "headers": cf_headers(headers)?,
        "origin": {
            "s3": {
                "authMethod": "none",
                "customHeaders": {},
                "domainName": cli.domain,
                "path": "",
                "region": cli.region,
            }
        }
    }))
}

/// `name=value` pairs in the CDN's `{lowercase: [{key, value}]}` shape.
fn cf_headers(pairs: &[String]) -> Result<Value, Box<dyn std::error::Error>> {
    let mut headers = serde_json::Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("header '{pair}' is not name=value"))?;
        let entries = headers
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(entries) = entries {
            entries.push(json!({ "key": key, "value": value }));
        }
    }
    Ok(Value::Object(headers))
}

fn event(event_type: &str, request: Value, response: Option<Value>) -> Value {
    let mut cf = json!({
        "config": {
            "distributionDomainName": "localhost",
            "eventType": event_type,
            "requestId": Uuid::new_v4().to_string(),
        },
        "request": request,
    });
    if let (Some(response), Some(cf)) = (response, cf.as_object_mut()) {
        cf.insert("response".to_string(), response);
    }
    json!({ "Records": [{ "cf": cf }] })
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: edge simulator returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
