pub fn print(value: i32) {
    println!("{}", format_value(value));
}

fn format_value(value: i32) -> String {
    format!("value={}", value)
}
