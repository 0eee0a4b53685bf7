use data_application_service::filter::Filter;
use serde_json::json;

// Composition laws of the public compiler entry point.

fn group(members: serde_json::Value) -> serde_json::Value {
    json!({"relation": "AND", "member": members})
}

#[test]
fn all_empty_groups_compile_to_nothing() {
    let detail = json!({"row_filters": {"where": [group(json!([])), group(json!([]))]}});
    assert_eq!(Filter::compile_str(&detail.to_string()).unwrap(), "");
}

#[test]
fn empty_fixed_side_is_transparent() {
    let user = json!({"where": [group(json!([{"name_en": "age", "data_type": "int", "operator": ">", "value": 3}]))]});
    let only_user = json!({"row_filters": user.clone()});
    let with_empty_fixed = json!({"row_filters": user, "fixed_row_filters": {"where": []}});

    assert_eq!(
        Filter::compile_str(&only_user.to_string()).unwrap(),
        Filter::compile_str(&with_empty_fixed.to_string()).unwrap()
    );
}

#[test]
fn groups_keep_input_order_under_or() {
    let detail = json!({"row_filters": {
        "where_relation": "OR",
        "where": [
            group(json!([{"name_en": "b", "data_type": "int", "operator": "=", "value": "2"}])),
            group(json!([{"name_en": "a", "data_type": "int", "operator": "=", "value": "1"}]))
        ]
    }});
    assert_eq!(Filter::compile_str(&detail.to_string()).unwrap(), "(\"b\" = 2) OR (\"a\" = 1)");
}

#[test]
fn fixed_side_wraps_multi_group_user_side() {
    let detail = json!({
        "fixed_row_filters": {"where": [group(json!([{"name_en": "t", "data_type": "char", "operator": "=", "value": "T1"}]))]},
        "row_filters": {
            "where_relation": "OR",
            "where": [
                group(json!([{"name_en": "a", "data_type": "int", "operator": "=", "value": "1"}])),
                group(json!([{"name_en": "b", "data_type": "int", "operator": "=", "value": "2"}]))
            ]
        }
    });
    assert_eq!(
        Filter::compile_str(&detail.to_string()).unwrap(),
        "((\"t\" = 'T1') AND ((\"a\" = 1) OR (\"b\" = 2)))"
    );
}

#[test]
fn single_value_in_list_keeps_in() {
    let detail = json!({"row_filters": {"where": [group(json!([
        {"name_en": "code", "data_type": "char", "operator": "in list", "value": "x"}
    ]))]}});
    assert_eq!(Filter::compile_str(&detail.to_string()).unwrap(), "(\"code\" IN ('x'))");
}
