// ── Variable registry ──
//
// NUT variable name → resolver. Built once at startup from the catalog
// (optionally overlaid from config) and read-only afterwards. Names are
// kept sorted so `LIST VAR` output is stable across runs.

use std::collections::BTreeMap;

use crate::resolver::Resolver;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    vars: BTreeMap<String, Resolver>,
}

impl Registry {
    /// The variables every apcupsd-backed UPS exposes.
    pub fn catalog() -> Self {
        let apc = Resolver::apc_or_ignore;

        [
            ("device.mfr", Resolver::UpsDescription),
            ("device.model", Resolver::UpsModel),
            ("device.serial", apc("SERIALNO")),
            ("device.type", Resolver::fixed("ups")),
            // ups.*
            ("ups.mfr", Resolver::UpsDescription),
            ("ups.mfr.date", apc("MANDATE")),
            ("ups.id", Resolver::fixed("APC")),
            ("ups.vendorid", Resolver::fixed("051d")),
            ("ups.model", Resolver::UpsModel),
            ("ups.status", Resolver::UpsStatus),
            ("ups.load", apc("LOADPCT")),
            ("ups.serial", apc("SERIALNO")),
            ("ups.firmware", apc("FIRMWARE")),
            ("ups.firmware.aux", apc("FIRMWARE")),
            ("ups.productid", apc("APC")),
            ("ups.temperature", apc("ITEMP")),
            ("ups.realpower.nominal", apc("NOMPOWER")),
            ("ups.test.result", Resolver::UpsSelfTest),
            ("ups.delay.start", Resolver::fixed("0")),
            ("ups.delay.shutdown", apc("DSHUTD")),
            ("ups.timer.reboot", Resolver::fixed("-1")),
            ("ups.timer.start", Resolver::fixed("-1")),
            ("ups.timer.shutdown", Resolver::fixed("-1")),
            ("ups.beeper.status", Resolver::fixed("enabled")),
            // battery.*
            ("battery.runtime", Resolver::battery_runtime()),
            ("battery.runtime.low", Resolver::battery_runtime_low()),
            ("battery.charge", apc("BCHARGE")),
            ("battery.charge.low", apc("MBATTCHG")),
            ("battery.charge.warning", Resolver::fixed("50")),
            ("battery.voltage", apc("BATTV")),
            ("battery.voltage.nominal", apc("NOMBATTV")),
            ("battery.date", apc("BATTDATE")),
            ("battery.mfr.date", apc("BATTDATE")),
            ("battery.temperature", apc("ITEMP")),
            ("battery.type", Resolver::fixed("PbAc")),
            // driver.*
            ("driver.name", Resolver::fixed("usbhid-ups")),
            (
                "driver.version.internal",
                Resolver::formatted("apcupsd {}", vec![apc("VERSION")]),
            ),
            ("driver.version.date", apc("DRIVER")),
            ("driver.parameter.pollfreq", Resolver::fixed("60")),
            ("driver.parameter.pollinterval", Resolver::fixed("10")),
            // input.* / output.*
            ("input.voltage", apc("LINEV")),
            ("input.voltage.nominal", apc("NOMINV")),
            ("input.sensitivity", apc("SENSE")),
            ("input.transfer.high", apc("HITRANS")),
            ("input.transfer.low", apc("LOTRANS")),
            ("input.frequency", apc("LINEFREQ")),
            ("input.transfer.reason", apc("LASTXFER")),
            ("output.voltage", apc("OUTPUTV")),
            ("output.voltage.nominal", apc("NOMOUTV")),
            (
                "server.info",
                Resolver::fixed(concat!("nutproxy ", env!("CARGO_PKG_VERSION"))),
            ),
        ]
        .into_iter()
        .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Resolver> {
        self.vars.get(name)
    }

    /// Add or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, resolver: Resolver) -> Option<Resolver> {
        self.vars.insert(name.into(), resolver)
    }

    /// Iterate variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resolver)> {
        self.vars.iter().map(|(name, resolver)| (name.as_str(), resolver))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Resolver)> for Registry {
    fn from_iter<I: IntoIterator<Item = (K, Resolver)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, resolver)| (name.into(), resolver))
                .collect(),
        }
    }
}

impl<K: Into<String>> Extend<(K, Resolver)> for Registry {
    fn extend<I: IntoIterator<Item = (K, Resolver)>>(&mut self, iter: I) {
        for (name, resolver) in iter {
            self.vars.insert(name.into(), resolver);
        }
    }
}
