//! Mock stock quote lookup

use super::{Tool, ToolError};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

/// Returns a made-up price for any symbol
pub struct StockPriceTool;

#[derive(Debug, Deserialize)]
struct StockPriceInput {
    symbol: String,
}

/// Random price between 50.00 and 499.99, formatted to cents
fn quote() -> String {
    let cents: u32 = rand::thread_rng().gen_range(5_000..50_000);
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        "getStockPrice"
    }

    fn description(&self) -> String {
        "Retrieve the latest closing price of a stock using its ticker symbol.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["symbol"],
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "The ticker symbol of the stock"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        let input: StockPriceInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let price = quote();
        tracing::debug!(symbol = %input.symbol, %price, "Quoted stock price");
        Ok(price)
    }
}
