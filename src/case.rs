//! Identifier case conversion: table names -> URL path segments (snake_case) and schema component names (PascalCase).

/// Convert an identifier to snake_case.
/// e.g. "Orders" -> "orders", "OrderItems" -> "order_items", "HTTPLog" -> "http_log", "order-lines" -> "order_lines"
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = if i > 0 { chars.get(i - 1).copied() } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out
}

/// Convert a snake_case (or any separator-delimited) identifier to PascalCase.
/// e.g. "order_items" -> "OrderItems", "sales_orders" -> "SalesOrders"
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if !c.is_alphanumeric() {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_from_table_names() {
        assert_eq!(to_snake_case("Orders"), "orders");
        assert_eq!(to_snake_case("orders"), "orders");
        assert_eq!(to_snake_case("OrderItems"), "order_items");
        assert_eq!(to_snake_case("order_items"), "order_items");
        assert_eq!(to_snake_case("HTTPLog"), "http_log");
        assert_eq!(to_snake_case("ORDERS"), "orders");
        assert_eq!(to_snake_case("order-lines"), "order_lines");
        assert_eq!(to_snake_case("Invoice2024"), "invoice2024");
    }

    #[test]
    fn pascal_case_from_segments() {
        assert_eq!(to_pascal_case("orders"), "Orders");
        assert_eq!(to_pascal_case("order_items"), "OrderItems");
        assert_eq!(to_pascal_case("sales_order_lines"), "SalesOrderLines");
    }
}
