use crate::common::addr::is_ipv4;

/// Split candidates into the first address's family and everything else.
///
/// Both halves keep their original relative order. Candidates that are not
/// IP literals count as non-IPv4.
pub fn partition(addrs: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut primaries = Vec::new();
    let mut fallbacks = Vec::new();
    let mut primary_label = false;
    for (i, addr) in addrs.into_iter().enumerate() {
        let label = is_ipv4(&addr);
        if i == 0 {
            primary_label = label;
        }
        if label == primary_label {
            primaries.push(addr);
        } else {
            fallbacks.push(addr);
        }
    }
    (primaries, fallbacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_input() {
        let (p, f) = partition(Vec::new());
        assert!(p.is_empty() && f.is_empty());
    }

    #[test]
    fn single_family_has_no_fallbacks() {
        let addrs = strings(&["10.0.0.1:80", "10.0.0.2:80"]);
        let (p, f) = partition(addrs.clone());
        assert_eq!(p, addrs);
        assert!(f.is_empty());
    }

    #[test]
    fn ipv6_first_becomes_primary() {
        let (p, f) = partition(strings(&[
            "[2001:db8::1]:80",
            "10.0.0.1:80",
            "[2001:db8::2]:80",
            "10.0.0.2:80",
        ]));
        assert_eq!(p, strings(&["[2001:db8::1]:80", "[2001:db8::2]:80"]));
        assert_eq!(f, strings(&["10.0.0.1:80", "10.0.0.2:80"]));
    }

    #[test]
    fn ipv4_first_becomes_primary() {
        let (p, f) = partition(strings(&[
            "10.0.0.1:80",
            "[2001:db8::1]:80",
            "[2001:db8::2]:80",
            "10.0.0.2:80",
        ]));
        assert_eq!(p, strings(&["10.0.0.1:80", "10.0.0.2:80"]));
        assert_eq!(f, strings(&["[2001:db8::1]:80", "[2001:db8::2]:80"]));
    }

    #[test]
    fn alternating_runs_are_not_merged() {
        let input = strings(&[
            "[::1]:1", "127.0.0.1:1", "[::2]:1", "127.0.0.2:1", "[::3]:1",
        ]);
        let (p, f) = partition(input.clone());
        assert_eq!(p, strings(&["[::1]:1", "[::2]:1", "[::3]:1"]));
        assert_eq!(f, strings(&["127.0.0.1:1", "127.0.0.2:1"]));

        let mut all: Vec<_> = p.into_iter().chain(f).collect();
        let mut expected = input;
        all.sort();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn non_literals_group_with_ipv6() {
        let (p, f) = partition(strings(&["10.0.0.1:80", "bogus:80", "[::1]:80"]));
        assert_eq!(p, strings(&["10.0.0.1:80"]));
        assert_eq!(f, strings(&["bogus:80", "[::1]:80"]));
    }
}
