//! The Go core runtime embedded in every emitted program.
//!
//! Everything Rugo's dynamic semantics need at run time lives in this one
//! blob: the universal value helpers (coercion, display, equality), the
//! arithmetic dispatchers, index/slice normalization, the ordered
//! mapping, lambdas, task handles, shell execution, and the collection
//! method dispatcher. The blob is self-consistent: every import in
//! [`CORE_IMPORTS`] is used by the runtime itself, so emitted programs
//! never trip Go's unused-import check regardless of which features the
//! user exercised.
//!
//! Module runtimes (stdlib `.go` files) are concatenated after this blob
//! once [`strip_go_prelude`] removes their `package`/`import` header;
//! their extra imports merge into the emitted import block instead.

/// Imports the core runtime requires.
pub const CORE_IMPORTS: &[&str] = &[
    "bufio",
    "fmt",
    "os",
    "os/exec",
    "runtime",
    "sort",
    "strconv",
    "strings",
    "sync",
    "time",
];

/// The core runtime source. Emitted verbatim after the import block.
pub const CORE_RUNTIME: &str = r##"
// ───────────────────────── rugo core runtime ─────────────────────────

type RugoMap struct {
	keys []string
	vals map[string]any
	disp map[string]any
}

func rugoMapNew() *RugoMap {
	return &RugoMap{vals: map[string]any{}, disp: map[string]any{}}
}

func rugoMapLit(pairs ...any) *RugoMap {
	m := rugoMapNew()
	for i := 0; i+1 < len(pairs); i += 2 {
		m.set(pairs[i], pairs[i+1])
	}
	return m
}

func rugoMapKey(k any) string { return rugoInspect(k) }

func (m *RugoMap) set(k, v any) {
	ck := rugoMapKey(k)
	if _, ok := m.vals[ck]; !ok {
		m.keys = append(m.keys, ck)
		m.disp[ck] = k
	}
	m.vals[ck] = v
}

func (m *RugoMap) get(k any) (any, bool) {
	v, ok := m.vals[rugoMapKey(k)]
	return v, ok
}

type RugoFunc struct {
	Arity int
	Fn    func(args []any) any
}

type RugoTask struct {
	result any
	err    string
	done   chan struct{}
}

// Opaque bridge handles implement this; dot access and method calls
// route through it.
type rugoHandle interface {
	rugoGet(name string) any
	rugoSet(name string, val any)
	rugoCall(name string, args []any) any
}

func rugoNewTask() *RugoTask { return &RugoTask{done: make(chan struct{})} }

func rugoMustTask(t any, method string) *RugoTask {
	task, ok := t.(*RugoTask)
	if !ok {
		panic(fmt.Sprintf(".%s is only available on tasks, got %s", method, rugoType(t)))
	}
	return task
}

func rugoTaskValue(t any) any {
	task := rugoMustTask(t, "value")
	<-task.done
	if task.err != "" {
		panic(task.err)
	}
	return task.result
}

func rugoTaskDone(t any) any {
	task := rugoMustTask(t, "done")
	select {
	case <-task.done:
		return true
	default:
		return false
	}
}

func rugoTaskWait(t any, secs any) any {
	task := rugoMustTask(t, "wait")
	d := time.Duration(rugoToFloat(secs) * float64(time.Second))
	select {
	case <-task.done:
		if task.err != "" {
			panic(task.err)
		}
		return task.result
	case <-time.After(d):
		panic(fmt.Sprintf("task did not finish within %ss", rugoToString(secs)))
	}
}

func rugoPanicMsg(r any) string {
	switch x := r.(type) {
	case string:
		return x
	case error:
		return x.Error()
	default:
		return fmt.Sprintf("%v", x)
	}
}

// Single-shot error latch for parallel blocks: the first panic wins.
func rugoParallelDone(wg *sync.WaitGroup, once *sync.Once, firstErr *any) {
	if r := recover(); r != nil {
		once.Do(func() { *firstErr = r })
	}
	wg.Done()
}

func rugoBridgeErr(msg string) string { return "rugo_bridge_err: " + msg }

func rugoRaise(v any) any { panic(rugoToString(v)) }

// ── coercions ──

func rugoToBool(v any) bool {
	switch x := v.(type) {
	case nil:
		return false
	case bool:
		return x
	default:
		return true
	}
}

func rugoToInt(v any) int {
	switch x := v.(type) {
	case int:
		return x
	case float64:
		return int(x)
	case bool:
		if x {
			return 1
		}
		return 0
	case string:
		n, err := strconv.Atoi(strings.TrimSpace(x))
		if err != nil {
			panic(fmt.Sprintf("cannot convert %q to integer", x))
		}
		return n
	}
	panic(fmt.Sprintf("cannot convert %s to integer", rugoType(v)))
}

func rugoToFloat(v any) float64 {
	switch x := v.(type) {
	case int:
		return float64(x)
	case float64:
		return x
	case string:
		f, err := strconv.ParseFloat(strings.TrimSpace(x), 64)
		if err != nil {
			panic(fmt.Sprintf("cannot convert %q to float", x))
		}
		return f
	}
	panic(fmt.Sprintf("cannot convert %s to float", rugoType(v)))
}

func rugoToString(v any) string {
	switch x := v.(type) {
	case nil:
		return ""
	case string:
		return x
	case bool:
		if x {
			return "true"
		}
		return "false"
	case int:
		return strconv.Itoa(x)
	case float64:
		return strconv.FormatFloat(x, 'f', -1, 64)
	case []any:
		parts := make([]string, len(x))
		for i, e := range x {
			parts[i] = rugoInspect(e)
		}
		return "[" + strings.Join(parts, ", ") + "]"
	case *RugoMap:
		parts := make([]string, 0, len(x.keys))
		for _, ck := range x.keys {
			parts = append(parts, rugoInspect(x.disp[ck])+" => "+rugoInspect(x.vals[ck]))
		}
		return "{" + strings.Join(parts, ", ") + "}"
	case *RugoFunc:
		return "#<fn/" + strconv.Itoa(x.Arity) + ">"
	case *RugoTask:
		return "#<task>"
	}
	return fmt.Sprintf("%v", v)
}

func rugoInspect(v any) string {
	if v == nil {
		return "nil"
	}
	if s, ok := v.(string); ok {
		return strconv.Quote(s)
	}
	return rugoToString(v)
}

func rugoType(v any) string {
	switch v.(type) {
	case nil:
		return "nil"
	case bool:
		return "bool"
	case int:
		return "int"
	case float64:
		return "float"
	case string:
		return "string"
	case []any:
		return "array"
	case *RugoMap:
		return "hash"
	case *RugoFunc:
		return "fn"
	case *RugoTask:
		return "task"
	}
	if _, ok := v.(rugoHandle); ok {
		return "handle"
	}
	return fmt.Sprintf("%T", v)
}

func rugoToStrSlice(v any) []string {
	xs, ok := v.([]any)
	if !ok {
		panic(fmt.Sprintf("expected an array of strings, got %s", rugoType(v)))
	}
	out := make([]string, len(xs))
	for i, e := range xs {
		out[i] = rugoToString(e)
	}
	return out
}

func rugoFromStrSlice(xs []string) any {
	out := make([]any, len(xs))
	for i, s := range xs {
		out[i] = s
	}
	return out
}

// ── arithmetic ──

func rugoIsFloat(v any) bool { _, ok := v.(float64); return ok }

func rugoNumInt(v any, op string) int {
	n, ok := v.(int)
	if !ok {
		panic(fmt.Sprintf("unsupported operand for %s: %s", op, rugoType(v)))
	}
	return n
}

func rugoNumFloat(v any, op string) float64 {
	switch x := v.(type) {
	case int:
		return float64(x)
	case float64:
		return x
	}
	panic(fmt.Sprintf("unsupported operand for %s: %s", op, rugoType(v)))
}

func rugoAdd(a, b any) any {
	if s, ok := a.(string); ok {
		return s + rugoToString(b)
	}
	if xs, ok := a.([]any); ok {
		if ys, ok := b.([]any); ok {
			return append(append([]any{}, xs...), ys...)
		}
	}
	if rugoIsFloat(a) || rugoIsFloat(b) {
		return rugoNumFloat(a, "+") + rugoNumFloat(b, "+")
	}
	return rugoNumInt(a, "+") + rugoNumInt(b, "+")
}

func rugoSub(a, b any) any {
	if rugoIsFloat(a) || rugoIsFloat(b) {
		return rugoNumFloat(a, "-") - rugoNumFloat(b, "-")
	}
	return rugoNumInt(a, "-") - rugoNumInt(b, "-")
}

func rugoMul(a, b any) any {
	if s, ok := a.(string); ok {
		return strings.Repeat(s, rugoToInt(b))
	}
	if rugoIsFloat(a) || rugoIsFloat(b) {
		return rugoNumFloat(a, "*") * rugoNumFloat(b, "*")
	}
	return rugoNumInt(a, "*") * rugoNumInt(b, "*")
}

func rugoDiv(a, b any) any {
	if rugoIsFloat(a) || rugoIsFloat(b) {
		return rugoNumFloat(a, "/") / rugoNumFloat(b, "/")
	}
	bi := rugoNumInt(b, "/")
	if bi == 0 {
		panic("division by zero")
	}
	return rugoNumInt(a, "/") / bi
}

func rugoMod(a, b any) any {
	bi := rugoNumInt(b, "%")
	if bi == 0 {
		panic("division by zero")
	}
	return rugoNumInt(a, "%") % bi
}

func rugoNeg(v any) any {
	switch x := v.(type) {
	case int:
		return -x
	case float64:
		return -x
	}
	panic(fmt.Sprintf("cannot negate %s", rugoType(v)))
}

func rugoNot(v any) any { return !rugoToBool(v) }

func rugoEq(a, b any) bool {
	switch x := a.(type) {
	case nil:
		return b == nil
	case int:
		switch y := b.(type) {
		case int:
			return x == y
		case float64:
			return float64(x) == y
		}
		return false
	case float64:
		switch y := b.(type) {
		case int:
			return x == float64(y)
		case float64:
			return x == y
		}
		return false
	case string:
		y, ok := b.(string)
		return ok && x == y
	case bool:
		y, ok := b.(bool)
		return ok && x == y
	case []any:
		y, ok := b.([]any)
		if !ok || len(x) != len(y) {
			return false
		}
		for i := range x {
			if !rugoEq(x[i], y[i]) {
				return false
			}
		}
		return true
	case *RugoMap:
		y, ok := b.(*RugoMap)
		if !ok || len(x.keys) != len(y.keys) {
			return false
		}
		for _, k := range x.keys {
			yv, present := y.vals[k]
			if !present || !rugoEq(x.vals[k], yv) {
				return false
			}
		}
		return true
	}
	return a == b
}

func rugoCompare(a, b any) int {
	if as, ok := a.(string); ok {
		if bs, ok := b.(string); ok {
			return strings.Compare(as, bs)
		}
	}
	af := rugoNumFloat(a, "compare")
	bf := rugoNumFloat(b, "compare")
	switch {
	case af < bf:
		return -1
	case af > bf:
		return 1
	default:
		return 0
	}
}

func rugoAnd(a any, b func() any) any {
	if rugoToBool(a) {
		return b()
	}
	return a
}

func rugoOr(a any, b func() any) any {
	if rugoToBool(a) {
		return a
	}
	return b()
}

// ── indexing and slicing ──

func rugoIndex(base, idx any) any {
	switch x := base.(type) {
	case []any:
		i := rugoToInt(idx)
		if i < 0 {
			i += len(x)
		}
		if i < 0 || i >= len(x) {
			panic(fmt.Sprintf("index %s out of range (len %d)", rugoToString(idx), len(x)))
		}
		return x[i]
	case string:
		r := []rune(x)
		i := rugoToInt(idx)
		if i < 0 {
			i += len(r)
		}
		if i < 0 || i >= len(r) {
			panic(fmt.Sprintf("index %s out of range (len %d)", rugoToString(idx), len(r)))
		}
		return string(r[i])
	case *RugoMap:
		v, ok := x.get(idx)
		if !ok {
			return nil
		}
		return v
	}
	panic(fmt.Sprintf("cannot index %s", rugoType(base)))
}

func rugoIndexSet(base, idx, val any) {
	switch x := base.(type) {
	case []any:
		i := rugoToInt(idx)
		if i < 0 {
			i += len(x)
		}
		if i < 0 || i >= len(x) {
			panic(fmt.Sprintf("index %s out of range (len %d)", rugoToString(idx), len(x)))
		}
		x[i] = val
		return
	case *RugoMap:
		x.set(idx, val)
		return
	}
	panic(fmt.Sprintf("cannot assign into %s", rugoType(base)))
}

// Slices clamp silently; a start past the end yields an empty sequence.
func rugoSliceBounds(length int, lo, hi any) (int, int) {
	start, end := 0, length
	if lo != nil {
		start = rugoToInt(lo)
		if start < 0 {
			start += length
		}
	}
	if hi != nil {
		end = rugoToInt(hi)
		if end < 0 {
			end += length
		}
	}
	if start < 0 {
		start = 0
	}
	if end > length {
		end = length
	}
	if start > end {
		return 0, 0
	}
	return start, end
}

func rugoSlice(base, lo, hi any) any {
	switch x := base.(type) {
	case []any:
		start, end := rugoSliceBounds(len(x), lo, hi)
		return append([]any{}, x[start:end]...)
	case string:
		r := []rune(x)
		start, end := rugoSliceBounds(len(r), lo, hi)
		return string(r[start:end])
	}
	panic(fmt.Sprintf("cannot slice %s", rugoType(base)))
}

// ── builtins ──

func rugoLen(v any) any {
	switch x := v.(type) {
	case string:
		return len([]rune(x))
	case []any:
		return len(x)
	case *RugoMap:
		return len(x.keys)
	}
	panic(fmt.Sprintf("len: unsupported type %s", rugoType(v)))
}

func rugoAppend(v any, items ...any) any {
	xs, ok := v.([]any)
	if !ok {
		panic(fmt.Sprintf("append expects an array, got %s", rugoType(v)))
	}
	return append(append([]any{}, xs...), items...)
}

func rugoPuts(args ...any) any {
	if len(args) == 0 {
		fmt.Println()
		return nil
	}
	for _, a := range args {
		fmt.Println(rugoToString(a))
	}
	return nil
}

func rugoPrint(args ...any) any {
	for _, a := range args {
		fmt.Print(rugoToString(a))
	}
	return nil
}

func rugoExit(code any) any {
	os.Exit(rugoToInt(code))
	return nil
}

func rugoSleep(secs any) any {
	time.Sleep(time.Duration(rugoToFloat(secs) * float64(time.Second)))
	return nil
}

func rugoGets() any {
	line, err := bufio.NewReader(os.Stdin).ReadString('\n')
	if err != nil && line == "" {
		return nil
	}
	return strings.TrimRight(line, "\n")
}

func rugoCall(f any, args ...any) any {
	fn, ok := f.(*RugoFunc)
	if !ok {
		panic(fmt.Sprintf("cannot call a %s", rugoType(f)))
	}
	if len(args) != fn.Arity {
		panic(fmt.Sprintf("wrong number of arguments (%d for %d)", len(args), fn.Arity))
	}
	return fn.Fn(args)
}

// ── shell ──

func rugoShell(cmd string) any {
	c := exec.Command("sh", "-c", cmd)
	c.Stdin = os.Stdin
	c.Stdout = os.Stdout
	c.Stderr = os.Stderr
	if err := c.Run(); err != nil {
		if ee, ok := err.(*exec.ExitError); ok {
			panic(fmt.Sprintf("shell command failed: %s (exit %d)", cmd, ee.ExitCode()))
		}
		panic(fmt.Sprintf("shell command failed: %s (%s)", cmd, err))
	}
	return nil
}

func rugoShellCapture(cmd string) any {
	c := exec.Command("sh", "-c", cmd)
	c.Stderr = os.Stderr
	out, err := c.Output()
	if err != nil {
		if ee, ok := err.(*exec.ExitError); ok {
			panic(fmt.Sprintf("shell command failed: %s (exit %d)", cmd, ee.ExitCode()))
		}
		panic(fmt.Sprintf("shell command failed: %s (%s)", cmd, err))
	}
	return strings.TrimRight(string(out), "\n")
}

func rugoShellPipe(cmd string, input any) any {
	c := exec.Command("sh", "-c", cmd)
	c.Stdin = strings.NewReader(rugoToString(input))
	c.Stderr = os.Stderr
	out, err := c.Output()
	if err != nil {
		if ee, ok := err.(*exec.ExitError); ok {
			panic(fmt.Sprintf("shell command failed: %s (exit %d)", cmd, ee.ExitCode()))
		}
		panic(fmt.Sprintf("shell command failed: %s (%s)", cmd, err))
	}
	return strings.TrimRight(string(out), "\n")
}

// ── dot access and method dispatch ──

func rugoStructType(m *RugoMap) (string, bool) {
	t, ok := m.vals[rugoMapKey("__type__")]
	if !ok {
		return "", false
	}
	return rugoToString(t), true
}

func rugoDot(recv any, name string) any {
	switch x := recv.(type) {
	case *RugoTask:
		switch name {
		case "value":
			return rugoTaskValue(x)
		case "done":
			return rugoTaskDone(x)
		}
	case *RugoMap:
		if v, ok := x.get(name); ok {
			return v
		}
		if t, ok := rugoStructType(x); ok {
			if fn, ok := rugoMethods[t+"."+name]; ok {
				return fn([]any{recv})
			}
		}
		panic(fmt.Sprintf("unknown field or method %q", name))
	}
	if h, ok := recv.(rugoHandle); ok {
		return h.rugoGet(name)
	}
	panic(fmt.Sprintf("cannot read field %q on %s", name, rugoType(recv)))
}

func rugoDotSet(recv any, name string, val any) {
	switch x := recv.(type) {
	case *RugoMap:
		x.set(name, val)
		return
	}
	if h, ok := recv.(rugoHandle); ok {
		h.rugoSet(name, val)
		return
	}
	panic(fmt.Sprintf("cannot set field %q on %s", name, rugoType(recv)))
}

func rugoMethod(recv any, name string, args ...any) any {
	switch x := recv.(type) {
	case *RugoTask:
		switch name {
		case "value":
			return rugoTaskValue(x)
		case "done":
			return rugoTaskDone(x)
		case "wait":
			if len(args) != 1 {
				panic("wait expects a timeout in seconds")
			}
			return rugoTaskWait(x, args[0])
		}
		panic(fmt.Sprintf("unknown task method %q", name))
	case *RugoMap:
		if t, ok := rugoStructType(x); ok {
			if fn, ok := rugoMethods[t+"."+name]; ok {
				return fn(append([]any{recv}, args...))
			}
		}
		return rugoMapMethod(x, name, args)
	case []any:
		return rugoSeqMethod(x, name, args)
	}
	if h, ok := recv.(rugoHandle); ok {
		return h.rugoCall(name, args)
	}
	panic(fmt.Sprintf("unknown method %q on %s", name, rugoType(recv)))
}

func rugoArgFn(args []any, i int, method string) *RugoFunc {
	if i >= len(args) {
		panic(fmt.Sprintf("%s expects a function argument", method))
	}
	fn, ok := args[i].(*RugoFunc)
	if !ok {
		panic(fmt.Sprintf("%s expects a function, got %s", method, rugoType(args[i])))
	}
	return fn
}

func rugoSeqMethod(xs []any, name string, args []any) any {
	switch name {
	case "map":
		fn := rugoArgFn(args, 0, "map")
		out := make([]any, 0, len(xs))
		for _, e := range xs {
			out = append(out, rugoCall(fn, e))
		}
		return out
	case "filter":
		fn := rugoArgFn(args, 0, "filter")
		out := []any{}
		for _, e := range xs {
			if rugoToBool(rugoCall(fn, e)) {
				out = append(out, e)
			}
		}
		return out
	case "each":
		fn := rugoArgFn(args, 0, "each")
		for _, e := range xs {
			rugoCall(fn, e)
		}
		return xs
	case "reduce":
		if len(args) != 2 {
			panic("reduce expects an initial value and a function")
		}
		fn := rugoArgFn(args, 1, "reduce")
		acc := args[0]
		for _, e := range xs {
			acc = rugoCall(fn, acc, e)
		}
		return acc
	case "sort_by":
		fn := rugoArgFn(args, 0, "sort_by")
		cp := append([]any{}, xs...)
		sort.SliceStable(cp, func(i, j int) bool {
			return rugoCompare(rugoCall(fn, cp[i]), rugoCall(fn, cp[j])) < 0
		})
		return cp
	case "any":
		fn := rugoArgFn(args, 0, "any")
		for _, e := range xs {
			if rugoToBool(rugoCall(fn, e)) {
				return true
			}
		}
		return false
	case "all":
		fn := rugoArgFn(args, 0, "all")
		for _, e := range xs {
			if !rugoToBool(rugoCall(fn, e)) {
				return false
			}
		}
		return true
	case "count":
		if len(args) == 0 {
			return len(xs)
		}
		fn := rugoArgFn(args, 0, "count")
		n := 0
		for _, e := range xs {
			if rugoToBool(rugoCall(fn, e)) {
				n++
			}
		}
		return n
	case "join":
		sep := ""
		if len(args) > 0 {
			sep = rugoToString(args[0])
		}
		parts := make([]string, len(xs))
		for i, e := range xs {
			parts[i] = rugoToString(e)
		}
		return strings.Join(parts, sep)
	case "first":
		if len(xs) == 0 {
			return nil
		}
		return xs[0]
	case "last":
		if len(xs) == 0 {
			return nil
		}
		return xs[len(xs)-1]
	case "min", "max":
		if len(xs) == 0 {
			return nil
		}
		best := xs[0]
		for _, e := range xs[1:] {
			c := rugoCompare(e, best)
			if (name == "min" && c < 0) || (name == "max" && c > 0) {
				best = e
			}
		}
		return best
	case "sum":
		var acc any = 0
		for _, e := range xs {
			acc = rugoAdd(acc, e)
		}
		return acc
	case "flatten":
		out := []any{}
		for _, e := range xs {
			if inner, ok := e.([]any); ok {
				out = append(out, rugoSeqMethod(inner, "flatten", nil).([]any)...)
			} else {
				out = append(out, e)
			}
		}
		return out
	case "uniq":
		seen := map[string]bool{}
		out := []any{}
		for _, e := range xs {
			k := rugoInspect(e)
			if !seen[k] {
				seen[k] = true
				out = append(out, e)
			}
		}
		return out
	case "flat_map":
		fn := rugoArgFn(args, 0, "flat_map")
		out := []any{}
		for _, e := range xs {
			r := rugoCall(fn, e)
			if inner, ok := r.([]any); ok {
				out = append(out, inner...)
			} else {
				out = append(out, r)
			}
		}
		return out
	case "take":
		n := rugoToInt(args[0])
		if n > len(xs) {
			n = len(xs)
		}
		if n < 0 {
			n = 0
		}
		return append([]any{}, xs[:n]...)
	case "drop":
		n := rugoToInt(args[0])
		if n > len(xs) {
			n = len(xs)
		}
		if n < 0 {
			n = 0
		}
		return append([]any{}, xs[n:]...)
	case "zip":
		ys, ok := args[0].([]any)
		if !ok {
			panic(fmt.Sprintf("zip expects an array, got %s", rugoType(args[0])))
		}
		out := make([]any, len(xs))
		for i, e := range xs {
			var other any
			if i < len(ys) {
				other = ys[i]
			}
			out[i] = []any{e, other}
		}
		return out
	case "chunk":
		n := rugoToInt(args[0])
		if n <= 0 {
			panic("chunk expects a positive size")
		}
		out := []any{}
		for i := 0; i < len(xs); i += n {
			end := i + n
			if end > len(xs) {
				end = len(xs)
			}
			out = append(out, append([]any{}, xs[i:end]...))
		}
		return out
	}
	panic(fmt.Sprintf("unknown method %q on array", name))
}

func rugoMapMethod(m *RugoMap, name string, args []any) any {
	switch name {
	case "keys":
		out := make([]any, len(m.keys))
		for i, ck := range m.keys {
			out[i] = m.disp[ck]
		}
		return out
	case "values":
		out := make([]any, len(m.keys))
		for i, ck := range m.keys {
			out[i] = m.vals[ck]
		}
		return out
	case "merge":
		other, ok := args[0].(*RugoMap)
		if !ok {
			panic(fmt.Sprintf("merge expects a hash, got %s", rugoType(args[0])))
		}
		out := rugoMapNew()
		for _, ck := range m.keys {
			out.set(m.disp[ck], m.vals[ck])
		}
		for _, ck := range other.keys {
			out.set(other.disp[ck], other.vals[ck])
		}
		return out
	case "each":
		fn := rugoArgFn(args, 0, "each")
		for _, ck := range m.keys {
			rugoCall(fn, m.disp[ck], m.vals[ck])
		}
		return m
	case "count":
		return len(m.keys)
	}
	panic(fmt.Sprintf("unknown method %q on hash", name))
}

// ── iteration ──

func rugoIterVals(v any) []any {
	switch x := v.(type) {
	case []any:
		return x
	case *RugoMap:
		out := make([]any, len(x.keys))
		for i, ck := range x.keys {
			out[i] = x.disp[ck]
		}
		return out
	case string:
		r := []rune(x)
		out := make([]any, len(r))
		for i, c := range r {
			out[i] = string(c)
		}
		return out
	}
	panic(fmt.Sprintf("cannot iterate over %s", rugoType(v)))
}

func rugoIterPairs(v any) [][2]any {
	switch x := v.(type) {
	case []any:
		out := make([][2]any, len(x))
		for i, e := range x {
			out[i] = [2]any{i, e}
		}
		return out
	case *RugoMap:
		out := make([][2]any, len(x.keys))
		for i, ck := range x.keys {
			out[i] = [2]any{x.disp[ck], x.vals[ck]}
		}
		return out
	}
	panic(fmt.Sprintf("cannot iterate over %s", rugoType(v)))
}

// ── backtrace ──

func rugoBacktrace(r any) {
	fmt.Fprintln(os.Stderr, "error: "+rugoPanicMsg(r))
	pcs := make([]uintptr, 64)
	n := runtime.Callers(3, pcs)
	frames := runtime.CallersFrames(pcs[:n])
	for {
		f, more := frames.Next()
		if strings.HasSuffix(f.File, ".rugo") || strings.HasSuffix(f.File, ".rg") {
			fmt.Fprintf(os.Stderr, "  at %s:%d\n", f.File, f.Line)
		}
		if !more {
			break
		}
	}
}
"##;

/// Strips the `package` clause and import block from a module runtime
/// file so it can be concatenated into the emitted program. The module's
/// imports are declared in its registration instead.
pub fn strip_go_prelude(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut in_import_block = false;
    for line in src.lines() {
        let trimmed = line.trim();
        if in_import_block {
            if trimmed.starts_with(')') {
                in_import_block = false;
            }
            continue;
        }
        if trimmed.starts_with("package ") {
            continue;
        }
        if trimmed.starts_with("import (") {
            in_import_block = true;
            continue;
        }
        if trimmed.starts_with("import ") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
