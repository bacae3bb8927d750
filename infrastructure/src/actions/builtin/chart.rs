//! `show_portfolio_chart`: rendered by the client, never executed here.

use dispatch_domain::{ActionDescriptor, ActionExample, FieldSpec, InputSchema, Refinement};
use serde_json::json;

pub const SHOW_PORTFOLIO_CHART: &str = "show_portfolio_chart";

pub fn portfolio_chart_descriptor() -> ActionDescriptor {
    ActionDescriptor::new(
        SHOW_PORTFOLIO_CHART,
        "Display a chart of the connected wallet's portfolio value over time.",
    )
    .with_aliases(["portfolio chart", "show portfolio"])
    .with_schema(
        InputSchema::new().with_field(
            FieldSpec::string("timeframe", "Window to chart")
                .with_default("7d")
                .with_refinement(Refinement::one_of(["1d", "7d", "30d", "1y"])),
        ),
    )
    .with_example(ActionExample::new(
        json!({"timeframe": "30d"}),
        json!({"rendered": "client"}),
        "Chart the last 30 days",
    ))
}
