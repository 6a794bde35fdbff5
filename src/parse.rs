use std::io::{self, BufRead};

/// One well-formed line from a netdb-style flat file.
///
/// The `data` field is opaque at this level: a bare protocol number for
/// `/etc/protocols`, a `port/proto` pair for `/etc/services`. The caller
/// decides how to interpret it.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) data: String,
    pub(crate) aliases: Vec<String>,
}

/// Forward-only parser over the lines of a services/protocols-style file.
///
/// Comments (`#` to end of line), blank lines and lines with fewer than two
/// fields are skipped. The underlying reader is released when the parser is
/// dropped; consuming the parser exhausts the stream, so a fresh one must be
/// opened to re-scan.
pub(crate) struct NetDbParser<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> NetDbParser<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Advances to the next well-formed entry, or `Ok(None)` at end of
    /// stream. Read failures surface to the caller.
    pub(crate) fn try_next(&mut self) -> io::Result<Option<Entry>> {
        loop {
            self.line.clear();

            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }

            // everything from the first '#' on is comment
            let text = match self.line.split('#').next() {
                Some(text) => text,
                None => continue,
            };

            let mut fields = text.split_whitespace();

            let name = match fields.next() {
                Some(name) => name,
                None => continue,
            };

            let data = match fields.next() {
                Some(data) => data,
                None => continue,
            };

            return Ok(Some(Entry {
                name: name.to_string(),
                data: data.to_string(),
                aliases: fields.map(str::to_string).collect(),
            }));
        }
    }
}

impl<R: BufRead> Iterator for NetDbParser<R> {
    type Item = Entry;

    /// Forgiving advancement: a read failure ends the sequence.
    fn next(&mut self) -> Option<Entry> {
        self.try_next().unwrap_or(None)
    }
}
