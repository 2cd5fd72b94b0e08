// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Verification pass over serialized output
//!
//! Property values must carry their type tag (`IFCREAL(42.0)`). A bare
//! literal in the value position of a single-value property means the
//! writer lost the wrapper somewhere.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

/// `IFCPROPERTYSINGLEVALUE(Name, Description, NominalValue` with the value captured
static SINGLE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)IFCPROPERTYSINGLEVALUE\s*\(\s*(?:'(?:[^']|'')*'|[^,'()]*)\s*,\s*(?:'(?:[^']|'')*'|[^,'()]*)\s*,\s*([^,)]*)",
    )
    .expect("single value pattern is valid")
});

static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?$").expect("number pattern is valid")
});

/// Count single-value records whose value is a bare numeric literal
pub fn count_unwrapped_values(text: &str) -> usize {
    let mut count = 0;

    for captures in SINGLE_VALUE.captures_iter(text) {
        let Some(value) = captures.get(1) else {
            continue;
        };
        if BARE_NUMBER.is_match(value.as_str().trim()) {
            warn!(
                "Untyped property value {} in {}",
                value.as_str().trim(),
                captures.get(0).map_or("", |m| m.as_str())
            );
            count += 1;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_is_flagged() {
        assert_eq!(
            count_unwrapped_values("#1=IFCPROPERTYSINGLEVALUE('Name','Desc',42,$);"),
            1
        );
        assert_eq!(
            count_unwrapped_values("#1=IFCPROPERTYSINGLEVALUE('Name','Desc',42);"),
            1
        );
    }

    #[test]
    fn test_tagged_value_passes() {
        assert_eq!(
            count_unwrapped_values("#1=IFCPROPERTYSINGLEVALUE('Name','Desc',IFCREAL(42.0),$);"),
            0
        );
        assert_eq!(
            count_unwrapped_values("#1=IFCPROPERTYSINGLEVALUE('Name',$,$,$);"),
            0
        );
    }

    #[test]
    fn test_number_forms() {
        for value in ["42.", "-1.5E-7", ".5", "+3"] {
            let record = format!("#1=IfcPropertySingleValue('N',$,{},$);", value);
            assert_eq!(count_unwrapped_values(&record), 1, "{}", value);
        }
    }

    #[test]
    fn test_quotes_and_commas_inside_names() {
        let text = "#1=IFCPROPERTYSINGLEVALUE('it''s, 7',$,IFCLABEL('8'),$);\n\
                    #2=IFCPROPERTYSINGLEVALUE( 'a' , 'b, c' , 9 , $);\n\
                    #3=IFCPROPERTYSET('g',$,'42',$,(#1,#2));";
        assert_eq!(count_unwrapped_values(text), 1);
    }
}
