use time::{macros::time, Date, Duration, PrimitiveDateTime, Time};
use tracing::debug;

use super::{
    products::MedicinalProducts,
    rules::{Boundary, Cycle, Region, ValidationRules, HOME_COUNTRY},
    ScanMode, ValidationStatus,
};
use crate::{
    definitions::{holder::Holder, vaccination::COVID_19, VaccinationDose},
    revocation::RevocationList,
};

const END_OF_DAY: Time = time!(23:59:59.999_999_999);

fn add_days(date: Date, days: u32) -> Date {
    date.checked_add(Duration::days(days.into()))
        .unwrap_or(Date::MAX)
}

/// Instants between which a dose is valid, both inclusive. The end is the
/// last instant of its day and never precedes the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

enum Position {
    Before,
    Inside,
    After,
}

impl ValidityWindow {
    pub fn new(date: Date, start_days: u32, end_days: u32) -> Self {
        let start = add_days(date, start_days);
        let end = add_days(date, end_days).max(start);
        Self {
            start: start.midnight(),
            end: end.with_time(END_OF_DAY),
        }
    }

    fn position(&self, at: PrimitiveDateTime) -> Position {
        if at < self.start {
            Position::Before
        } else if at > self.end {
            Position::After
        } else {
            Position::Inside
        }
    }
}

type Strategy<'e> = fn(&Evaluation<'e>) -> ValidationStatus;

fn strategy<'e>(mode: ScanMode) -> Strategy<'e> {
    match mode {
        ScanMode::Standard => Evaluation::standard,
        ScanMode::Strengthened => Evaluation::strengthened,
        ScanMode::Booster => Evaluation::booster,
        ScanMode::School => Evaluation::school,
        ScanMode::Work => Evaluation::work,
        ScanMode::Entry => Evaluation::entry,
    }
}

/// Evaluates vaccination doses against the rule table.
#[derive(Debug, Clone, Default)]
pub struct VaccineChecker {
    rules: ValidationRules,
    products: MedicinalProducts,
}

impl VaccineChecker {
    pub fn new(rules: ValidationRules, products: MedicinalProducts) -> Self {
        Self { rules, products }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Status of `dose` at `at` under `mode`.
    ///
    /// Revocation is checked first, then the disease target, then whether an
    /// incomplete cycle uses an accepted product. Only then are dates looked
    /// at.
    pub fn check(
        &self,
        dose: &VaccinationDose,
        holder: &Holder,
        mode: ScanMode,
        at: PrimitiveDateTime,
        revoked: &dyn RevocationList,
    ) -> ValidationStatus {
        if revoked.is_revoked(dose.certificate_id()) {
            debug!("certificate {} is revoked", dose.certificate_id());
            return ValidationStatus::Revoked;
        }
        if dose.disease_target() != COVID_19 {
            return ValidationStatus::NotEuDcc;
        }
        if !dose.is_complete() && !self.products.is_ema(dose.product(), dose.country()) {
            return ValidationStatus::NotValid;
        }

        let evaluation = Evaluation {
            rules: &self.rules,
            products: &self.products,
            dose,
            holder,
            at,
        };
        let status = strategy(mode)(&evaluation);
        debug!("{mode} evaluation of {}: {status}", dose.product());
        status
    }

    /// Like [`check`](Self::check) with the mode given by its code. Modes
    /// that do not exist yield [`ValidationStatus::NotEuDcc`].
    pub fn check_code(
        &self,
        dose: &VaccinationDose,
        holder: &Holder,
        mode: &str,
        at: PrimitiveDateTime,
        revoked: &dyn RevocationList,
    ) -> ValidationStatus {
        match mode.parse::<ScanMode>() {
            Ok(mode) => self.check(dose, holder, mode, at, revoked),
            Err(_) => ValidationStatus::NotEuDcc,
        }
    }
}

struct Evaluation<'a> {
    rules: &'a ValidationRules,
    products: &'a MedicinalProducts,
    dose: &'a VaccinationDose,
    holder: &'a Holder,
    at: PrimitiveDateTime,
}

impl Evaluation<'_> {
    fn is_ema(&self) -> bool {
        self.products
            .is_ema(self.dose.product(), self.dose.country())
    }

    fn cycle(&self) -> Cycle {
        if self.dose.is_booster() {
            Cycle::Booster
        } else {
            Cycle::Complete
        }
    }

    /// Offset for a completed cycle from `region`'s row.
    fn complete_days(&self, boundary: Boundary, region: Region) -> u32 {
        let cycle = self.cycle();
        let extra = match (boundary, cycle) {
            (Boundary::Start, Cycle::Complete) => {
                self.rules.complete_start_extra(self.dose.product())
            }
            _ => 0,
        };
        self.rules
            .offset(boundary, cycle, region)
            .saturating_add(extra)
    }

    fn not_complete_window(&self) -> ValidityWindow {
        let days = self.rules.not_complete(self.dose.product());
        ValidityWindow::new(self.dose.date(), days.start, days.end)
    }

    fn window(&self, region: Region) -> ValidityWindow {
        if !self.dose.is_complete() {
            return self.not_complete_window();
        }
        ValidityWindow::new(
            self.dose.date(),
            self.complete_days(Boundary::Start, region),
            self.complete_days(Boundary::End, region),
        )
    }

    fn school_window(&self) -> ValidityWindow {
        if !self.dose.is_complete() {
            return self.not_complete_window();
        }
        let end = if self.dose.is_booster() {
            self.complete_days(Boundary::End, Region::Home)
        } else {
            self.rules.school_end
        };
        ValidityWindow::new(
            self.dose.date(),
            self.complete_days(Boundary::Start, Region::Home),
            end,
        )
    }

    /// Outside the window by date, else invalid for products or cycles that
    /// are not accepted.
    fn default_results(&self, window: ValidityWindow) -> ValidationStatus {
        match window.position(self.at) {
            Position::Before => ValidationStatus::NotValidYet,
            Position::After => ValidationStatus::Expired,
            Position::Inside if !self.is_ema() || !self.dose.is_complete() => {
                ValidationStatus::NotValid
            }
            Position::Inside => ValidationStatus::Valid,
        }
    }

    fn standard(&self) -> ValidationStatus {
        match self.window(Region::Home).position(self.at) {
            Position::Before => ValidationStatus::NotValidYet,
            Position::After => ValidationStatus::Expired,
            Position::Inside if !self.is_ema() => ValidationStatus::NotValid,
            Position::Inside => ValidationStatus::Valid,
        }
    }

    fn strengthened(&self) -> ValidationStatus {
        if self.dose.country() == HOME_COUNTRY {
            return self.standard();
        }
        let ema = self.is_ema();
        if !self.dose.is_complete() && !ema {
            return ValidationStatus::NotValid;
        }

        // Doses given abroad still use the home rows.
        let window = self.window(Region::Home);
        if !self.dose.is_complete() {
            return match window.position(self.at) {
                Position::Before => ValidationStatus::NotValidYet,
                Position::After => ValidationStatus::Expired,
                Position::Inside => ValidationStatus::Valid,
            };
        }
        if self.dose.is_booster() {
            return match window.position(self.at) {
                Position::Before => ValidationStatus::NotValidYet,
                Position::After => ValidationStatus::Expired,
                Position::Inside if ema => ValidationStatus::Valid,
                Position::Inside => ValidationStatus::TestNeeded,
            };
        }

        let extended = add_days(self.dose.date(), self.rules.extended_ema_end).with_time(END_OF_DAY);
        if self.at < window.start {
            ValidationStatus::NotValidYet
        } else if ema && self.at <= window.end {
            ValidationStatus::Valid
        } else if self.at <= extended {
            ValidationStatus::TestNeeded
        } else {
            ValidationStatus::Expired
        }
    }

    fn booster(&self) -> ValidationStatus {
        match self.window(Region::Home).position(self.at) {
            Position::Before => ValidationStatus::NotValidYet,
            Position::After => ValidationStatus::Expired,
            Position::Inside if !self.dose.is_complete() => ValidationStatus::NotValid,
            Position::Inside if self.dose.is_booster() && self.is_ema() => {
                ValidationStatus::Valid
            }
            Position::Inside => ValidationStatus::TestNeeded,
        }
    }

    fn school(&self) -> ValidationStatus {
        self.default_results(self.school_window())
    }

    /// Without a known date of birth the stricter strategy applies.
    fn work(&self) -> ValidationStatus {
        match self.holder.age_on(self.at.date()) {
            Some(age) if age < self.rules.mandatory_age => self.standard(),
            _ => self.strengthened(),
        }
    }

    fn entry(&self) -> ValidationStatus {
        self.default_results(self.window(Region::Abroad))
    }
}
