// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// State code table — the two-letter region codes accepted in uploaded
// filenames, and the names they stand for.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Every valid region code with its state name. Each code appears once.
const STATE_CODES: [(&str, &str); 33] = [
    ("AS", "AGUASCALIENTES"),
    ("BC", "BAJA CALIFORNIA"),
    ("BS", "BAJA CALIFORNIA SUR"),
    ("CC", "CAMPECHE"),
    ("CL", "COAHUILA"),
    ("CM", "COLIMA"),
    ("CS", "CHIAPAS"),
    ("CH", "CHIHUAHUA"),
    ("DF", "DISTRITO FEDERAL"),
    ("DG", "DURANGO"),
    ("GT", "GUANAJUATO"),
    ("GR", "GUERRERO"),
    ("HG", "HIDALGO"),
    ("JC", "JALISCO"),
    ("MC", "MÉXICO"),
    ("MN", "MICHOACÁN"),
    ("MS", "MORELOS"),
    ("NT", "NAYARIT"),
    ("NL", "NUEVO LEÓN"),
    ("OC", "OAXACA"),
    ("PL", "PUEBLA"),
    ("QT", "QUERÉTARO"),
    ("QR", "QUINTANA ROO"),
    ("SP", "SAN LUIS POTOSÍ"),
    ("SL", "SINALOA"),
    ("SR", "SONORA"),
    ("TC", "TABASCO"),
    ("TS", "TAMAULIPAS"),
    ("TL", "TLAXCALA"),
    ("VZ", "VERACRUZ"),
    ("YN", "YUCATÁN"),
    ("ZS", "ZACATECAS"),
    ("NE", "NACIDO EN EL EXTRANJERO"),
];

static TABLE: LazyLock<BTreeMap<&'static str, &'static str>> =
    LazyLock::new(|| STATE_CODES.into_iter().collect());

/// Read-only view over the process-wide state code table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCodeTable;

impl StateCodeTable {
    /// Name of the state for an already-uppercased code.
    pub fn name(code: &str) -> Option<&'static str> {
        TABLE.get(code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_33_unique_codes() {
        assert_eq!(TABLE.len(), STATE_CODES.len());
    }

    #[test]
    fn codes_are_two_uppercase_letters() {
        for (code, _) in STATE_CODES {
            assert_eq!(code.len(), 2, "{code}");
            assert!(code.chars().all(|c| c.is_ascii_uppercase()), "{code}");
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(StateCodeTable::name("DF"), Some("DISTRITO FEDERAL"));
        assert_eq!(StateCodeTable::name("NE"), Some("NACIDO EN EL EXTRANJERO"));
        assert_eq!(StateCodeTable::name("df"), None);
        assert_eq!(StateCodeTable::name("XX"), None);
    }
}
