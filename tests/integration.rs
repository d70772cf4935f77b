//! Integration tests for the compensation engine.
//!
//! These run JSON-shaped requests through the standard calculator registry,
//! the way a payroll run would:
//! - Commission, tiered commission and formula worked examples
//! - Legacy and block-structured plan configs
//! - Aliased plan-type tags
//! - Period filtering of transactions
//! - Partial-failure tolerance across a batch
//! - Formula validation before activation

use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;

use compensation_engine::calculation::{Calculator, CalculatorRegistry};
use compensation_engine::config::{ConfigLoader, EngineConfig};
use compensation_engine::formula::{ErrorType, FormulaValidator};
use compensation_engine::models::{
    CalculationRequest, CalculationResult, CompensationPlan, DetailType, EmployeeSnapshot,
    PayPeriod, Transaction,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_registry() -> CalculatorRegistry {
    let config = ConfigLoader::load("./config/engine.yaml")
        .expect("Failed to load config")
        .into_config();
    CalculatorRegistry::standard(&config)
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn create_request(employee_id: &str, plan: Value, sales: &str) -> CalculationRequest {
    serde_json::from_value(json!({
        "employee": { "id": employee_id },
        "plan": plan,
        "salesAmount": sales,
        "period": "2026-01"
    }))
    .expect("valid request")
}

fn commission_plan() -> Value {
    json!({
        "id": "plan_commission",
        "type": "commission",
        "name": "Field Sales",
        "config": { "blocks": [
            { "type": "basic_salary", "amount": 3000 },
            { "type": "commission", "threshold": 5000, "rate": 0.1 }
        ] }
    })
}

fn tiered_plan() -> Value {
    json!({
        "id": "plan_tiered",
        "type": "tiered_commission",
        "name": "Progressive",
        "config": { "brackets": [
            { "threshold": 5000, "pct": 5 },
            { "threshold": 10000, "pct": 8 }
        ] }
    })
}

fn formula_plan() -> Value {
    json!({
        "id": "plan_formula",
        "type": "formula_based",
        "name": "Eligibility Bonus",
        "config": {
            "variables": [
                { "name": "baseSalary", "defaultValue": 1000, "source": { "type": "constant" } },
                { "name": "sales", "source": { "type": "salesAmount" } },
                { "name": "threshold", "defaultValue": 10000 },
                { "name": "bonusAmount", "defaultValue": 500 }
            ],
            "steps": [
                { "id": "s1", "name": "Eligibility", "result": "isEligible",
                  "operation": { "type": "greaterThanOrEqual", "parameters": ["sales", "threshold"] } },
                { "id": "s2", "name": "Bonus", "result": "actualBonus",
                  "operation": { "type": "if", "parameters": ["isEligible", "bonusAmount", 0] } },
                { "id": "s3", "name": "Total", "result": "total",
                  "operation": { "type": "add", "parameters": ["baseSalary", "actualBonus"] } }
            ],
            "outputVariable": "total"
        }
    })
}

/// Reuses the `rate` sub-expression, so each evaluation has one memo hit.
fn shared_rate_plan() -> Value {
    json!({
        "id": "plan_shared_rate",
        "type": "formula",
        "name": "Shared Rate",
        "config": {
            "variables": [
                { "name": "sales", "source": { "type": "salesAmount" } },
                { "name": "baseSalary", "defaultValue": 1000 }
            ],
            "steps": [
                { "id": "s1", "name": "Commission", "result": "commission",
                  "operation": { "type": "round", "parameters": [
                      { "id": "rate", "operation": { "type": "multiply",
                                                     "parameters": ["sales", "0.1"] } }
                  ] } },
                { "id": "s2", "name": "Total", "result": "total",
                  "operation": { "type": "add", "parameters": [
                      "baseSalary",
                      { "id": "rate", "operation": { "type": "multiply",
                                                     "parameters": ["sales", "0.1"] } }
                  ] } }
            ],
            "outputVariable": "total"
        }
    })
}

fn transactions() -> Vec<Transaction> {
    serde_json::from_value(json!([
        { "id": "b1", "employeeId": "emp_001", "amount": 250, "date": "2026-01-12", "description": "Referral" },
        { "id": "b2", "employeeId": "emp_001", "amount": 999, "date": "2026-02-01", "description": "Next month" },
        { "id": "b3", "employeeId": "emp_002", "amount": 400, "date": "2026-01-20", "description": "Other employee" }
    ]))
    .expect("valid transactions")
}

// =============================================================================
// Worked Examples
// =============================================================================

#[test]
fn test_commission_example() {
    let registry = create_registry();
    let result = registry.calculate(&create_request("emp_001", commission_plan(), "8000"));

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.base_salary, decimal("3000"));
    assert_eq!(result.commission, decimal("300"));
    assert_eq!(result.total, decimal("3300"));
}

#[test]
fn test_commission_example_with_transactions() {
    let registry = create_registry();
    let mut request = create_request("emp_001", commission_plan(), "8000");
    let period = PayPeriod::parse(&request.period).unwrap();
    request.bonuses = Transaction::for_employee_in_period(&transactions(), "emp_001", &period);

    let result = registry.calculate(&request);

    assert_eq!(result.bonus_total, decimal("250"));
    assert_eq!(result.total, decimal("3550"));
}

#[test]
fn test_tiered_example() {
    let registry = create_registry();
    let result = registry.calculate(&create_request("emp_001", tiered_plan(), "12000"));

    assert!(result.success);
    assert_eq!(result.commission, decimal("810"));

    let tier_amounts: Vec<Decimal> = result
        .details
        .iter()
        .filter(|d| d.detail_type == DetailType::CommissionTier)
        .map(|d| d.amount)
        .collect();
    assert_eq!(
        tier_amounts,
        vec![decimal("250"), decimal("400"), decimal("160")]
    );
}

#[test]
fn test_formula_example() {
    let registry = create_registry();

    let above = registry.calculate(&create_request("emp_001", formula_plan(), "12000"));
    assert!(above.success, "{:?}", above.error);
    assert_eq!(above.total, decimal("1500"));

    let below = registry.calculate(&create_request("emp_001", formula_plan(), "8000"));
    assert_eq!(below.total, decimal("1000"));
}

#[test]
fn test_commission_below_threshold_is_zero() {
    let registry = create_registry();
    for sales in ["0", "1", "4999.99", "5000"] {
        let result = registry.calculate(&create_request("emp_001", commission_plan(), sales));
        assert_eq!(result.commission, Decimal::ZERO, "sales {}", sales);
    }
}

// =============================================================================
// Plan Types and Aliases
// =============================================================================

#[test]
fn test_legacy_tags_share_calculators() {
    let registry = create_registry();
    for tag in ["commission", "sales_commission", "commission_based", "basic_commission"] {
        let mut plan = commission_plan();
        plan["id"] = json!(format!("plan_{}", tag));
        plan["type"] = json!(tag);
        let result = registry.calculate(&create_request("emp_001", plan, "8000"));
        assert_eq!(result.total, decimal("3300"), "tag {}", tag);
        assert_eq!(result.plan_type, tag);
    }
}

#[test]
fn test_fixed_plan_with_tiered_bonus() {
    let registry = create_registry();
    let plan = json!({
        "id": "plan_fixed",
        "type": "fixed_salary",
        "name": "Salaried",
        "config": {
            "base_salary": 4200,
            "bonus_tiers": [
                { "threshold": 10000, "bonus": 300 },
                { "threshold": 20000, "bonus": 700 }
            ]
        }
    });

    let result = registry.calculate(&create_request("emp_001", plan, "20000"));
    assert_eq!(result.target_bonus, decimal("700"));
    assert_eq!(result.total, decimal("4900"));
}

// =============================================================================
// Batches and Failure Handling
// =============================================================================

#[test]
fn test_batch_with_partial_failures() {
    let registry = create_registry();

    let mut unknown = commission_plan();
    unknown["type"] = json!("bespoke");
    let mut broken = commission_plan();
    broken["config"] = json!({ "blocks": [ { "type": "commission", "rate": 0.1 } ] });

    let requests = vec![
        create_request("emp_001", commission_plan(), "8000"),
        create_request("emp_002", unknown, "8000"),
        create_request("emp_003", broken, "8000"),
        create_request("emp_004", formula_plan(), "12000"),
    ];

    let results = registry.calculate_batch(&requests);

    assert_eq!(results.len(), 4);
    assert!(results[0].success);
    assert_eq!(results[1].error.as_deref(), Some("Unknown plan type: bespoke"));
    assert!(!results[2].success);
    assert_eq!(results[2].total, Decimal::ZERO);
    assert!(results[3].success);
    assert_eq!(
        results.iter().map(|r| r.employee_id.as_str()).collect::<Vec<_>>(),
        vec!["emp_001", "emp_002", "emp_003", "emp_004"]
    );
}

#[test]
fn test_no_plan_row() {
    let result = CalculationResult::no_plan("emp_009", "2026-01");
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "No compensation plan assigned");
}

#[test]
fn test_formula_division_by_zero_fails_inline() {
    let registry = create_registry();
    let plan = json!({
        "id": "plan_div",
        "type": "custom_formula",
        "name": "Broken",
        "config": {
            "steps": [
                { "id": "s1", "name": "Ratio", "result": "ratio",
                  "operation": { "type": "divide", "parameters": ["salesAmount", 0] } }
            ],
            "outputVariable": "ratio"
        }
    });

    let result = registry.calculate(&create_request("emp_001", plan, "1000"));
    assert!(!result.success);
    assert_eq!(result.total, Decimal::ZERO);
    assert_eq!(result.error.as_deref(), Some("Division by zero in step 's1'"));
}

#[test]
fn test_cached_results_are_served_per_calculator() {
    let registry = CalculatorRegistry::standard(&EngineConfig::default());
    let request = create_request("emp_001", commission_plan(), "8000");

    let first = registry.calculate(&request);
    let second = registry.calculate(&request);
    assert_eq!(first, second);

    let stats = registry
        .get_calculator("commission")
        .unwrap()
        .result_cache()
        .map(|cache| cache.stats())
        .unwrap();
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_concurrent_batches_match_serial_results() {
    let registry = create_registry();
    let requests: Vec<CalculationRequest> = (0..8)
        .flat_map(|i| {
            let employee = format!("emp_{:03}", i);
            let sales = (6_000 + i * 1_000).to_string();
            [
                create_request(&employee, commission_plan(), &sales),
                create_request(&employee, shared_rate_plan(), &sales),
            ]
        })
        .collect();
    let serial = CalculatorRegistry::standard(&EngineConfig::default().without_cache())
        .calculate_batch(&requests);

    let concurrent: Vec<Vec<CalculationResult>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| registry.calculate_batch(&requests)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for results in &concurrent {
        assert_eq!(results.len(), serial.len());
        for (result, expected) in results.iter().zip(&serial) {
            assert!(result.success, "{:?}", result.error);
            assert_eq!(result.employee_id, expected.employee_id);
            assert_eq!(result.total, expected.total);
            assert_eq!(result.commission, expected.commission);
            assert_eq!(result.details, expected.details);
            match (&result.trace, &expected.trace) {
                (Some(trace), Some(expected_trace)) => {
                    assert_eq!(trace.cache_hits, 1);
                    assert_eq!(trace.steps.len(), expected_trace.steps.len());
                }
                (None, None) => {}
                _ => panic!("trace mismatch for {}", result.employee_id),
            }
        }
    }

    let stats = registry
        .get_calculator("commission")
        .unwrap()
        .result_cache()
        .map(|cache| cache.stats())
        .unwrap();
    assert_eq!(stats.hits + stats.misses, 4 * 8);
}

#[test]
fn test_result_serializes_for_rendering() {
    let registry = create_registry();
    let result = registry.calculate(&create_request("emp_001", formula_plan(), "12000"));
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["total"], "1500");
    assert_eq!(value["planName"], "Eligibility Bonus");
    assert_eq!(value["trace"]["steps"].as_array().unwrap().len(), 3);
}

// =============================================================================
// Validation Before Activation
// =============================================================================

#[test]
fn test_formula_plan_validates_cleanly() {
    let plan: CompensationPlan = serde_json::from_value(formula_plan()).unwrap();
    let report = FormulaValidator::default().validate_plan(&plan);

    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_cyclic_formula_is_rejected() {
    let plan = CompensationPlan::new(
        "plan_cycle",
        "formula",
        "Cycle",
        json!({
            "steps": [
                { "id": "a", "name": "A", "result": "x",
                  "operation": { "type": "add", "parameters": ["y", 1] } },
                { "id": "b", "name": "B", "result": "y",
                  "operation": { "type": "add", "parameters": ["x", 1] } }
            ],
            "outputVariable": "y"
        }),
    );
    let report = FormulaValidator::default().validate_plan(&plan);

    assert!(!report.is_valid);
    assert!(
        report
            .errors
            .iter()
            .any(|e| {
                e.error_type == ErrorType::Structure && e.message.contains("Circular dependency")
            })
    );
}

#[test]
fn test_employee_snapshot_attributes_feed_formula() {
    let registry = create_registry();
    let plan = json!({
        "id": "plan_tenure",
        "type": "formula",
        "name": "Tenure Pay",
        "config": { "formula": {
            "variables": [
                { "name": "years", "defaultValue": 0,
                  "source": { "type": "employeeAttribute", "path": "profile.yearsOfService" } }
            ],
            "steps": [
                { "id": "s1", "name": "Pay", "result": "baseSalary",
                  "operation": { "type": "add", "parameters": [
                      2000,
                      { "id": "n1", "operation": { "type": "multiply", "parameters": ["years", 50] } }
                  ] } }
            ],
            "outputVariable": "baseSalary"
        } }
    });
    let mut request = create_request("emp_001", plan, "0");
    request.employee = EmployeeSnapshot::new("emp_001")
        .with_attribute("profile", json!({ "yearsOfService": 4 }));

    let result = registry.calculate(&request);
    assert_eq!(result.base_salary, decimal("2200"));
    assert_eq!(result.total, decimal("2200"));
}
