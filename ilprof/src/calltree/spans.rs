use ilprof_common::MAX_SPAN_GAP;

/// Groups ascending addresses into `(first, last)` spans. An address further than
/// `max_gap` bytes from the start of the current span opens a new one.
pub struct AddressSpans<I> {
    addresses: I,
    max_gap: u64,
    current: Option<(u64, u64)>,
}

impl<I: Iterator<Item = u64>> Iterator for AddressSpans<I> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        for address in self.addresses.by_ref() {
            match self.current {
                Some((first, _)) if address - first > self.max_gap => {
                    return self.current.replace((address, address));
                }
                Some((first, _)) => self.current = Some((first, address)),
                None => self.current = Some((address, address)),
            }
        }

        self.current.take()
    }
}

pub fn address_spans<I>(addresses: I, max_gap: u64) -> AddressSpans<I::IntoIter>
where
    I: IntoIterator<Item = u64>,
{
    AddressSpans {
        addresses: addresses.into_iter(),
        max_gap,
        current: None,
    }
}

/// spans over sampled addresses using the default gap
pub fn sample_spans<I>(addresses: I) -> AddressSpans<I::IntoIter>
where
    I: IntoIterator<Item = u64>,
{
    address_spans(addresses, MAX_SPAN_GAP)
}
