/// Size formatting — the short human-readable form shown in menu titles.
///
/// All sizes are `u64` bytes. The arithmetic stays in integers: the value is
/// scaled by 100 so two decimal places survive the repeated division by
/// 1024, which is how the boot loader prints sizes.

const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];

/// Format a byte count as e.g. `512B`, `2.00K`, `4.37G`.
///
/// Binary units (1K = 1024). Values below 1K are printed as whole bytes
/// with no decimals; terabytes are the largest unit.
pub fn format_size(bytes: u64) -> String {
    let mut scaled = u128::from(bytes) * 100;
    let mut unit = 0;
    while unit < UNITS.len() - 1 && scaled >= 102_400 {
        scaled /= 1024;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes}{}", UNITS[0])
    } else {
        format!("{}.{:02}{}", scaled / 100, scaled % 100, UNITS[unit])
    }
}
