use serde::Serialize;
use std::num::{IntErrorKind, NonZeroU32};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum RequestedPage {
    #[default]
    First,
    Number(i64),
}

impl RequestedPage {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::First;
        };

        match raw.trim().parse::<i64>() {
            Ok(number) => Self::Number(number),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow => Self::Number(i64::MAX),
                IntErrorKind::NegOverflow => Self::Number(i64::MIN),
                _ => Self::First,
            },
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Paginator {
    #[must_use]
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    #[must_use]
    pub fn per_page(self) -> NonZeroU32 {
        self.per_page
    }

    #[must_use]
    pub fn num_pages(self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.per_page.get())).max(1)
    }

    #[must_use]
    pub fn window(self, count: u64, requested: RequestedPage) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested {
            RequestedPage::First => 1,
            RequestedPage::Number(number) => u64::try_from(number)
                .ok()
                .filter(|number| (1..=num_pages).contains(number))
                .unwrap_or(num_pages),
        };

        PageWindow {
            number,
            num_pages,
            count,
            per_page: self.per_page,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    count: u64,
    per_page: NonZeroU32,
}

impl PageWindow {
    #[must_use]
    pub fn number(self) -> u64 {
        self.number
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        (self.number - 1) * u64::from(self.per_page.get())
    }

    #[must_use]
    pub fn limit(self) -> u32 {
        self.per_page.get()
    }

    #[must_use]
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
            next_page: (self.number < self.num_pages).then_some(self.number + 1),
            previous_page: (self.number > 1).then_some(self.number - 1),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
}
